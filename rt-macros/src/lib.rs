use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, ItemFn};

/// Turns `fn main() -> R` into the process entry point.
///
/// The value returned by the annotated body is handed to `rt::Termination::terminate`,
/// so the generated `main` never returns to the standard runtime.
#[proc_macro_attribute]
pub fn entry(_args: TokenStream, input: TokenStream) -> TokenStream {
    let f = parse_macro_input!(input as ItemFn);

    let attrs = f.attrs;
    let stmts = f.block.stmts;
    let ret = f.sig.output;

    quote! {
        #(#attrs)*
        fn main() {
            use rt::Termination;

            fn __og() #ret {
                #(#stmts)*
            }

            __og().terminate()
        }
    }
    .into()
}
