//! Declarative service definitions.

/// Define a typed client for a remote service.
///
/// The generated type builds its [`ServiceDescriptor`](crate::ServiceDescriptor)
/// once per process and exposes one async method per declared RPC.
///
/// # Example
///
/// ```rust,ignore
/// use protorpc_client::rpc_service;
///
/// rpc_service! {
///     /// Client for the `Echo` service.
///     pub service EchoClient = "Echo" {
///         rpc say(SayRequest) -> SayResponse;
///         rpc shout(SayRequest) -> SayResponse;
///     }
/// }
///
/// let echo = EchoClient::new(transport)?;
/// let reply = echo.say(&SayRequest { text: "hi".into() }).await?;
/// ```
#[macro_export]
macro_rules! rpc_service {
    (
        $(#[$meta:meta])*
        $vis:vis service $name:ident = $service:literal {
            $(
                $(#[$method_meta:meta])*
                rpc $method:ident($req:ty) -> $resp:ty;
            )*
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone)]
        $vis struct $name {
            service: $crate::Service,
        }

        impl $name {
            pub const SERVICE_NAME: &'static str = $service;

            /// Shared descriptor, built on first use.
            pub fn descriptor() -> ::std::result::Result<
                ::std::sync::Arc<$crate::ServiceDescriptor>,
                $crate::RegistryError,
            > {
                static DESCRIPTOR: ::std::sync::OnceLock<
                    ::std::result::Result<
                        ::std::sync::Arc<$crate::ServiceDescriptor>,
                        $crate::RegistryError,
                    >,
                > = ::std::sync::OnceLock::new();

                DESCRIPTOR
                    .get_or_init(|| {
                        let builder = $crate::ServiceDescriptor::builder($service);
                        $(
                            let builder = builder.method(
                                $crate::MethodDescriptor::typed::<$req, $resp>(stringify!($method))?,
                            );
                        )*
                        builder.build().map(::std::sync::Arc::new)
                    })
                    .clone()
            }

            pub fn new(
                transport: ::std::sync::Arc<dyn $crate::Transport>,
            ) -> ::std::result::Result<Self, $crate::RegistryError> {
                Ok($name {
                    service: $crate::Service::new(Self::descriptor()?, transport),
                })
            }

            pub fn service(&self) -> &$crate::Service {
                &self.service
            }

            $(
                $(#[$method_meta])*
                pub async fn $method(
                    &self,
                    request: &$req,
                ) -> ::std::result::Result<$resp, $crate::ServiceError> {
                    self.service.call_typed(stringify!($method), request).await
                }
            )*
        }
    };
}
