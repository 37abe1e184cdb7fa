pub mod status;

pub use status::AppointmentStatusService;
