//! CmpiProvider derive macro implementation

use proc_macro2::{Literal, TokenStream};
use quote::{format_ident, quote};
use syn::DeriveInput;

use crate::parse::{parse_cmpi_provider, CmpiProviderArgs};

/// Generate the CmpiProvider implementation
pub fn derive_cmpi_provider(input: DeriveInput) -> TokenStream {
    match parse_cmpi_provider(&input).and_then(|args| generate_impl(&args)) {
        Ok(tokens) => tokens,
        Err(e) => e.write_errors(),
    }
}

fn generate_impl(args: &CmpiProviderArgs) -> darling::Result<TokenStream> {
    let struct_name = &args.ident;
    if !args.generics.params.is_empty() {
        return Err(darling::Error::custom("CmpiProvider cannot be derived for generic types")
            .with_span(&args.generics));
    }

    let name = args.provider_name()?;
    let kinds: Vec<_> = args.kinds().into_iter().filter(|k| k.enabled).collect();
    if kinds.is_empty() {
        return Err(darling::Error::custom(
            "at least one provider kind is required: instance, association, method, property or indication",
        )
        .with_span(struct_name));
    }

    // NUL-terminated name for `miName`
    let c_name = Literal::byte_string(format!("{name}\0").as_bytes());

    let kind_variants: Vec<_> = kinds
        .iter()
        .map(|k| format_ident!("{}", k.variant))
        .collect();

    // Kind-erased factories for in-process registration
    let registrations = kinds.iter().map(|k| {
        let variant = format_ident!("{}", k.variant);
        let factory = format_ident!("{}_factory", k.variant.to_lowercase());
        quote! {
            table.register(
                #name,
                ::cmpi_core::engine::MiKind::#variant,
                ::cmpi_core::provider::#factory::<Self>,
            );
        }
    });

    // `<name>_Create_<Kind>MI` entry points
    let exports = kinds.iter().map(|k| {
        let symbol = format_ident!("{}_Create_{}MI", name, k.variant);
        let envelope = format_ident!("CMPI{}MI", k.variant);
        let create = format_ident!("create_{}_mi", k.variant.to_lowercase());
        quote! {
            #[no_mangle]
            #[allow(non_snake_case)]
            #[doc(hidden)]
            pub unsafe extern "C" fn #symbol(
                mb: *const ::cmpi_core::sdk::CMPIBroker,
                ctx: *const ::cmpi_core::sdk::CMPIContext,
                rc: *mut ::cmpi_core::sdk::CMPIStatus,
            ) -> *mut ::cmpi_core::sdk::#envelope {
                ::cmpi_core::provider::#create::<#struct_name>(mb, ctx, rc)
            }
        }
    });

    Ok(quote! {
        impl ::cmpi_core::provider::ProviderExport for #struct_name {
            const NAME: &'static ::std::ffi::CStr =
                // SAFETY: the name is a C identifier followed by a single NUL
                unsafe { ::std::ffi::CStr::from_bytes_with_nul_unchecked(#c_name) };

            const KINDS: &'static [::cmpi_core::engine::MiKind] =
                &[#(::cmpi_core::engine::MiKind::#kind_variants),*];

            fn base() -> &'static ::cmpi_core::provider::ProviderBase<Self> {
                static BASE: ::cmpi_core::provider::ProviderBase<#struct_name> =
                    ::cmpi_core::provider::ProviderBase::new();
                &BASE
            }

            fn register_static(table: &mut ::cmpi_core::engine::StaticFactories) {
                #(#registrations)*
            }
        }

        #(#exports)*
    })
}
