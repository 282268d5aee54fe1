pub mod clock;
pub mod cost;
pub mod error;
pub mod models;
pub mod payment;
pub mod pii;
pub mod policy;
pub mod repository;
pub mod status;
pub mod validation;

pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{BookingError, BookingResult, ErrorKind, PassengerIssue};
pub use models::{
    Booking, Flight, FlightStatus, Money, Passenger, PassengerInput, Payment, Seat, SeatClass,
    ServiceFlags,
};
pub use policy::BookingRules;
pub use repository::{BookingStore, FlightDirectory, RefundRecord, StoreError, StoreResult};
pub use status::{BookingEvent, BookingStatus, PaymentEvent, PaymentStatus, TransitionError};
