pub mod reservation;
pub mod service;
pub mod slot;

pub use reservation::{Actor, ActorRole, Reservation, ReservationStatus};
pub use service::{Barber, BarberStatus, ServiceSpec};
pub use slot::Slot;
