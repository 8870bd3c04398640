//! Procedural macros for testkit-compliance
//!
//! This crate provides the `#[testkit_compliance::test]` attribute macro,
//! which runs a test inside a compliance harness and tears it down when the
//! test ends.
//!
//! # Example
//!
//! ```rust,ignore
//! use testkit_compliance::prelude::*;
//!
//! #[testkit_compliance::test(strict = true)]
//! fn my_test(harness: ComplianceHarness) {
//!     let spy = harness.mock_fn::<(), Option<Immediate>>();
//!     spy.mock_return_value(Some(Immediate::fulfilled()));
//!     let _ = spy.call(());
//!     assert_eq!(spy.async_compliance(), vec![false]);
//! }
//! ```

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{
    parse::{Parse, ParseStream},
    parse_macro_input, FnArg, Ident, ItemFn, Lit, Pat, Token, Type,
};

/// Configuration options for the test macro.
#[derive(Default)]
struct TestConfig {
    /// Enable tracking on every spy the harness creates (default: false)
    strict: bool,
    /// Registry scope ("isolated" or "global")
    scope: Option<String>,
    /// Flavor for the tokio runtime of async tests ("current_thread" or "multi_thread")
    flavor: Option<String>,
}

impl Parse for TestConfig {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let mut config = TestConfig::default();

        while !input.is_empty() {
            let ident: Ident = input.parse()?;
            input.parse::<Token![=]>()?;

            match ident.to_string().as_str() {
                "strict" => {
                    let lit: Lit = input.parse()?;
                    if let Lit::Bool(b) = lit {
                        config.strict = b.value();
                    }
                }
                "scope" => {
                    let lit: Lit = input.parse()?;
                    if let Lit::Str(s) = lit {
                        config.scope = Some(s.value());
                    }
                }
                "flavor" => {
                    let lit: Lit = input.parse()?;
                    if let Lit::Str(s) = lit {
                        config.flavor = Some(s.value());
                    }
                }
                _ => {
                    return Err(syn::Error::new(
                        ident.span(),
                        format!("unknown attribute: {ident}"),
                    ));
                }
            }

            if input.peek(Token![,]) {
                input.parse::<Token![,]>()?;
            }
        }

        Ok(config)
    }
}

/// Determines if a function parameter is requesting a ComplianceHarness.
fn is_harness_param(arg: &FnArg) -> bool {
    if let FnArg::Typed(pat_type) = arg {
        if let Type::Path(type_path) = &*pat_type.ty {
            if let Some(segment) = type_path.path.segments.last() {
                return segment.ident == "ComplianceHarness";
            }
        }
    }
    false
}

/// Extracts the parameter name from a function argument.
fn get_param_name(arg: &FnArg) -> Option<&Pat> {
    if let FnArg::Typed(pat_type) = arg {
        Some(&pat_type.pat)
    } else {
        None
    }
}

/// Test attribute macro running a test inside a compliance harness.
///
/// Works on both `fn` and `async fn` tests; async tests run on tokio. The
/// harness is dropped when the test body finishes, restoring every spy
/// registered in it.
///
/// # Harness Injection
///
/// Add a `harness: ComplianceHarness` parameter to receive the harness:
///
/// ```rust,ignore
/// #[testkit_compliance::test]
/// async fn test_with_harness(harness: ComplianceHarness) {
///     let spy = harness.fluent_spy::<(), ()>();
///     spy.enable_strict_async_compliance();
/// }
/// ```
///
/// # Configuration Options
///
/// - `strict = true` - Enable tracking on every spy the harness creates
/// - `scope = "isolated"` or `scope = "global"` - Registry the harness uses
/// - `flavor = "multi_thread"` - Tokio runtime flavor for async tests
///
/// ```rust,ignore
/// #[testkit_compliance::test(strict = true, scope = "global")]
/// fn test_global(harness: ComplianceHarness) {
///     assert!(harness.config().strict_by_default());
/// }
/// ```
#[proc_macro_attribute]
pub fn test(attr: TokenStream, item: TokenStream) -> TokenStream {
    let config = parse_macro_input!(attr as TestConfig);
    let input = parse_macro_input!(item as ItemFn);

    expand_test(config, input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

fn expand_test(config: TestConfig, input: ItemFn) -> syn::Result<TokenStream2> {
    let name = &input.sig.ident;
    let body = &input.block;
    let attrs = &input.attrs;
    let vis = &input.vis;
    let output = &input.sig.output;

    if input.sig.inputs.len() > 1
        || input.sig.inputs.iter().any(|arg| !is_harness_param(arg))
    {
        return Err(syn::Error::new_spanned(
            &input.sig.inputs,
            "test function may only take a `ComplianceHarness` parameter",
        ));
    }

    let scope = match config.scope.as_deref().unwrap_or("isolated") {
        "isolated" => quote! { ::testkit_compliance::compliance::RegistryScope::Isolated },
        "global" => quote! { ::testkit_compliance::compliance::RegistryScope::Global },
        other => {
            return Err(syn::Error::new(
                proc_macro2::Span::call_site(),
                format!("unsupported scope: {other}. Use \"isolated\" or \"global\""),
            ));
        }
    };
    let strict = config.strict;

    // The harness lives until the end of the test, where dropping it tears it down.
    let harness_name = input
        .sig
        .inputs
        .iter()
        .find(|arg| is_harness_param(arg))
        .and_then(get_param_name)
        .map_or_else(|| quote! { __testkit_compliance_harness }, |pat| quote! { #pat });

    let harness_init = quote! {
        let #harness_name = ::testkit_compliance::harness::ComplianceHarness::with_config(
            ::testkit_compliance::ComplianceConfig::new()
                .with_strict_by_default(#strict)
                .with_scope(#scope)
        );
    };

    let wrapper = if input.sig.asyncness.is_some() {
        let flavor_attr = match config.flavor.as_deref().unwrap_or("current_thread") {
            "multi_thread" => quote! { #[::tokio::test(flavor = "multi_thread")] },
            "current_thread" => quote! { #[::tokio::test] },
            other => {
                return Err(syn::Error::new(
                    proc_macro2::Span::call_site(),
                    format!(
                        "unsupported flavor: {other}. Use \"current_thread\" or \"multi_thread\""
                    ),
                ));
            }
        };
        quote! {
            #flavor_attr
            #(#attrs)*
            #vis async fn #name() #output {
                #harness_init
                #body
            }
        }
    } else {
        if config.flavor.is_some() {
            return Err(syn::Error::new_spanned(
                &input.sig,
                "`flavor` only applies to async test functions",
            ));
        }
        quote! {
            #[::core::prelude::v1::test]
            #(#attrs)*
            #vis fn #name() #output {
                #harness_init
                #body
            }
        }
    };

    Ok(wrapper)
}
