//! Bridge server: forwards issue-tracker comments as emails and email
//! replies as issue comments, correlated through a durable store of
//! outbound message ids.

pub mod config;
pub mod dispatch;
pub mod error;
pub mod extract;
pub mod identity;
pub mod providers;
pub mod reply;
pub mod request_logger;
pub mod routes;
pub mod store;

use std::sync::Arc;
use std::sync::Once;

use env_logger::Env;
use rocket::{Build, Rocket};

use crate::config::BridgeConfig;
use crate::dispatch::BridgeDispatcher;
use crate::identity::IdentityResolver;
use crate::providers::{GitHubClient, IdentityProvider, MailgunClient};
use crate::request_logger::RequestLogger;
use crate::store::CorrelationStore;

static LOGGER: Once = Once::new();

fn init_logger() {
    LOGGER.call_once(|| {
        env_logger::Builder::from_env(
            Env::default().default_filter_or("info,rocket::server=warn,rocket::request=warn"),
        )
        .init();
    });
}

/// Build the Rocket instance wired against the real GitHub and Mailgun
/// clients, configured from the environment.
pub fn rocket() -> Rocket<Build> {
    init_logger();

    let config = BridgeConfig::from_env();
    log::info!("starting bridge server on {}", config.listen_addr);
    if config.dry_run {
        log::warn!("dry-run mode enabled: no mails sent, no comments posted, no correlations recorded");
    }

    let store = Arc::new(
        CorrelationStore::open(&config.store_path).expect("failed to open correlation store"),
    );

    // Startup integrity pass over the persisted correlations.
    let correlations = store.list_all();
    log::info!("correlation store holds {} entries", correlations.len());
    for (message_id, issue_number) in &correlations {
        log::debug!("correlation {} -> issue #{}", message_id, issue_number);
    }

    let github = Arc::new(GitHubClient::new(&config).expect("failed to construct tracker client"));
    let mailgun =
        Arc::new(MailgunClient::new(&config).expect("failed to construct email client"));

    let identity =
        IdentityResolver::new(Arc::clone(&github) as Arc<dyn IdentityProvider>);
    let dispatcher = Arc::new(BridgeDispatcher::new(
        identity,
        Arc::clone(&store),
        mailgun,
        github,
        config.mail_sender.clone(),
        config.dry_run,
    ));

    let figment = rocket::Config::figment();
    let figment = match config.listen_parts() {
        Some((host, port)) => figment
            .merge(("address", host.to_string()))
            .merge(("port", port)),
        None => {
            log::warn!(
                "listen address {:?} is not host:port, falling back to Rocket defaults",
                config.listen_addr
            );
            figment
        }
    };

    rocket::custom(figment)
        .attach(RequestLogger)
        .manage(store)
        .manage(dispatcher)
        .register("/", rocket::catchers![error::default_catcher])
        .mount(
            "/",
            rocket::routes![
                // Health routes
                routes::health::health_check,
                // Webhook routes
                routes::tracker::tracker_webhook,
                routes::email::email_webhook,
                // Admin routes
                routes::admin::store_status,
                routes::admin::list_correlations,
            ],
        )
}

#[cfg_attr(not(test), allow(dead_code))]
pub mod test_support {
    //! Builders and collaborator doubles for exercising the bridge
    //! without a network or external services.

    use std::sync::Arc;

    use parking_lot::Mutex;
    use rocket::config::LogLevel;
    use rocket::figment::Figment;
    use rocket::local::asynchronous::Client as AsyncClient;
    use rocket::local::blocking::Client;
    use rocket::{Build, Rocket, Route};

    use crate::dispatch::BridgeDispatcher;
    use crate::providers::{EmailSender, IdentityProvider, ProviderError, TrackerClient};
    use crate::store::CorrelationStore;

    /// Identity provider returning a fixed display name.
    pub struct StubIdentityProvider {
        name: String,
    }

    impl StubIdentityProvider {
        pub fn named(name: &str) -> Self {
            Self {
                name: name.to_string(),
            }
        }
    }

    #[rocket::async_trait]
    impl IdentityProvider for StubIdentityProvider {
        async fn display_name(&self, _handle: &str) -> Result<String, ProviderError> {
            Ok(self.name.clone())
        }
    }

    /// Identity provider that always fails, for outage scenarios.
    pub struct FailingIdentityProvider;

    #[rocket::async_trait]
    impl IdentityProvider for FailingIdentityProvider {
        async fn display_name(&self, _handle: &str) -> Result<String, ProviderError> {
            Err(ProviderError::MissingField("display name"))
        }
    }

    /// One email captured by [`RecordingEmailSender`].
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct SentEmail {
        pub from: String,
        pub subject: String,
        pub body: String,
        pub to: String,
    }

    /// Email sender that records every send and returns a fixed message
    /// id, or fails the next send when constructed with `failing`.
    pub struct RecordingEmailSender {
        message_id: String,
        error: Mutex<Option<ProviderError>>,
        sent: Mutex<Vec<SentEmail>>,
    }

    impl RecordingEmailSender {
        pub fn returning(message_id: &str) -> Self {
            Self {
                message_id: message_id.to_string(),
                error: Mutex::new(None),
                sent: Mutex::new(Vec::new()),
            }
        }

        /// The next send fails with `error`; later sends succeed.
        pub fn failing(error: ProviderError) -> Self {
            Self {
                message_id: String::new(),
                error: Mutex::new(Some(error)),
                sent: Mutex::new(Vec::new()),
            }
        }

        pub fn sent(&self) -> Vec<SentEmail> {
            self.sent.lock().clone()
        }
    }

    #[rocket::async_trait]
    impl EmailSender for RecordingEmailSender {
        async fn send(
            &self,
            from: &str,
            subject: &str,
            body: &str,
            to: &str,
        ) -> Result<String, ProviderError> {
            if let Some(err) = self.error.lock().take() {
                return Err(err);
            }
            self.sent.lock().push(SentEmail {
                from: from.to_string(),
                subject: subject.to_string(),
                body: body.to_string(),
                to: to.to_string(),
            });
            Ok(self.message_id.clone())
        }
    }

    /// Tracker client that records every created comment.
    pub struct RecordingTrackerClient {
        comments: Mutex<Vec<(i64, String)>>,
        fail: bool,
    }

    impl RecordingTrackerClient {
        pub fn new() -> Self {
            Self {
                comments: Mutex::new(Vec::new()),
                fail: false,
            }
        }

        pub fn failing() -> Self {
            Self {
                comments: Mutex::new(Vec::new()),
                fail: true,
            }
        }

        pub fn comments(&self) -> Vec<(i64, String)> {
            self.comments.lock().clone()
        }
    }

    impl Default for RecordingTrackerClient {
        fn default() -> Self {
            Self::new()
        }
    }

    #[rocket::async_trait]
    impl TrackerClient for RecordingTrackerClient {
        async fn create_comment(
            &self,
            issue_number: i64,
            body: &str,
        ) -> Result<(), ProviderError> {
            if self.fail {
                return Err(ProviderError::MissingField("comment acknowledgement"));
            }
            self.comments.lock().push((issue_number, body.to_string()));
            Ok(())
        }
    }

    /// Builder for constructing Rocket instances tailored for tests.
    #[derive(Default)]
    pub struct TestRocketBuilder {
        figment: Figment,
        mounts: Vec<(String, Vec<Route>)>,
        dispatcher: Option<Arc<BridgeDispatcher>>,
        store: Option<Arc<CorrelationStore>>,
    }

    impl TestRocketBuilder {
        /// Start a builder with sensible defaults: random port, logging disabled.
        pub fn new() -> Self {
            let figment = rocket::Config::figment()
                .merge(("port", 0))
                .merge(("log_level", LogLevel::Off))
                .merge(("cli_colors", false));

            Self {
                figment,
                mounts: Vec::new(),
                dispatcher: None,
                store: None,
            }
        }

        /// Mount routes at the server root, as the real build does.
        pub fn mount_routes(mut self, routes: Vec<Route>) -> Self {
            self.mounts.push(("/".to_string(), routes));
            self
        }

        /// Manage a dispatcher for webhook routes.
        pub fn manage_dispatcher(mut self, dispatcher: Arc<BridgeDispatcher>) -> Self {
            self.dispatcher = Some(dispatcher);
            self
        }

        /// Manage a correlation store for admin routes.
        pub fn manage_store(mut self, store: Arc<CorrelationStore>) -> Self {
            self.store = Some(store);
            self
        }

        /// Finish building the Rocket instance.
        pub fn build(self) -> Rocket<Build> {
            let mut rocket = rocket::custom(self.figment)
                .register("/", rocket::catchers![crate::error::default_catcher]);

            for (base, routes) in self.mounts {
                rocket = rocket.mount(base, routes);
            }

            if let Some(dispatcher) = self.dispatcher {
                rocket = rocket.manage(dispatcher);
            }
            if let Some(store) = self.store {
                rocket = rocket.manage(store);
            }

            rocket
        }

        /// Convenience helper to produce a blocking local client.
        pub fn blocking_client(self) -> Client {
            Client::tracked(self.build()).expect("valid Rocket instance")
        }

        /// Convenience helper to produce an asynchronous local client.
        pub async fn async_client(self) -> AsyncClient {
            AsyncClient::tracked(self.build())
                .await
                .expect("valid Rocket instance")
        }
    }
}
