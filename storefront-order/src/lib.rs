pub mod models;
pub mod customer;
pub mod checkout;
pub mod tracking;
pub mod state;

pub use models::{Address, CartLine, CheckoutRequest, OrderDraft, OrderReceipt, OrderType, PricedLine};
pub use customer::{CustomerError, CustomerLookup, CustomerProfile, CustomerService, CustomerType};
pub use checkout::{CheckoutError, CheckoutService, MAX_QTY_PER_ITEM};
pub use tracking::{OrderHistory, OrderTracker, TrackingError};
pub use state::AppState;
