pub mod auth;
pub mod bus;
pub mod config;
pub mod content;
pub mod metrics;
pub mod processing;
pub mod testing;

pub use auth::{
    create_authenticator, AuthError, AuthRequest, Authenticator, GatewayAuthenticator, Identity,
    NoneAuthenticator,
};
pub use bus::{connect_bus, BusError, BusMessage, LocalBus, MessageBus, NatsBus, Subscription};
pub use config::{
    load_config, load_config_from_str, validate_config, AuthConfig, AuthMethod, BusConfig, Config,
    ConfigError, DatabaseConfig, LogFormat, LoggingConfig, ProcessingConfig, ServerConfig,
    VideoDispatch,
};
pub use content::{
    ContentError, ContentFilter, ContentPatch, ContentRecord, ContentStatus, ContentStore,
    MediaEntry, MediaKind, MediaMerge, SqliteContentStore,
};
pub use processing::{
    ApplyOutcome, CompletionOutcome, ContentUpdate, DispatchReport, Dispatcher, IngestError,
    ProcessingRequest, ProcessingResult, ProcessingStatus, ResultIngestor, TaskTracker,
    TrackerError, Transport,
};
