pub mod config;
pub mod flows;
pub mod gateway;
pub mod session;
pub mod surface;
pub mod view;

pub use config::{load_settings, ClientSettings, ConfigError};
pub use flows::{FlowKind, WalletApp, REGISTER_SUCCESS_MESSAGE};
pub use gateway::{ApiGateway, GatewayInitError, RequestOutcome, Route, NETWORK_ERROR_MESSAGE};
pub use session::{FileSlots, MemorySlots, SessionStore, SessionStoreError, SlotStorage};
pub use surface::{Element, InputField, MemorySurface, ViewSurface};
pub use view::{DashboardPanel, DismissalTicket, FormScope, ViewController, ViewError, ViewState};

#[cfg(test)]
#[path = "tests/mock_server.rs"]
mod mock_server;
