use unsynn::*;

keyword! {
    KFn = "fn";
}

unsynn! {
    struct UntilFn {
        items: Any<Cons<Except<KFn>, TokenTree>>,
    }

    struct UntilBody {
        items: Any<Cons<Except<BraceGroup>, TokenTree>>,
    }

    struct Body {
        items: BraceGroup,
    }

    struct FunctionDecl {
        until_fn: UntilFn, _fn: KFn, name: Ident,
        until_body: UntilBody, body: Body
    }
}

impl quote::ToTokens for UntilFn {
    fn to_tokens(&self, tokens: &mut unsynn::TokenStream) {
        self.items.to_tokens(tokens)
    }
}

impl quote::ToTokens for UntilBody {
    fn to_tokens(&self, tokens: &mut unsynn::TokenStream) {
        self.items.to_tokens(tokens)
    }
}

impl quote::ToTokens for Body {
    fn to_tokens(&self, tokens: &mut unsynn::TokenStream) {
        tokens.extend(self.items.0.stream())
    }
}

/// Maps `#[test(debug)]`-style arguments to a `log::LevelFilter` variant.
/// No argument means "whatever `PARTWISE_LOG` says".
fn level_from_attr(attr: TokenStream) -> Option<TokenStream> {
    let level = attr.into_iter().find_map(|tt| match tt {
        TokenTree::Ident(ident) => Some(ident.to_string()),
        _ => None,
    })?;

    let variant = match level.as_str() {
        "off" => quote::quote! { Off },
        "error" => quote::quote! { Error },
        "warn" => quote::quote! { Warn },
        "info" => quote::quote! { Info },
        "debug" => quote::quote! { Debug },
        "trace" => quote::quote! { Trace },
        other => panic!(
            "#[partwise_testhelpers::test]: unknown log level `{other}`, \
             expected one of off, error, warn, info, debug, trace"
        ),
    };
    Some(variant)
}

#[proc_macro_attribute]
pub fn test(
    attr: proc_macro::TokenStream,
    item: proc_macro::TokenStream,
) -> proc_macro::TokenStream {
    let setup = match level_from_attr(TokenStream::from(attr)) {
        Some(variant) => quote::quote! {
            ::partwise_testhelpers::setup_at(::partwise_testhelpers::LevelFilter::#variant);
        },
        None => quote::quote! {
            ::partwise_testhelpers::setup();
        },
    };

    let item = TokenStream::from(item);
    let mut i = item.to_token_iter();
    let fdecl = i.parse::<FunctionDecl>().unwrap();

    let FunctionDecl {
        until_fn,
        _fn,
        name,
        until_body,
        body,
    } = fdecl;

    quote::quote! {
        #[::core::prelude::rust_2024::test]
        #until_fn fn #name #until_body -> ::partwise_testhelpers::eyre::Result<()> {
            #setup

            #body

            Ok(())
        }
    }
    .into()
}
