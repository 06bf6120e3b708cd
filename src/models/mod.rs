pub mod availability;
pub mod business_hours;
pub mod invoice;
pub mod payment;
pub mod product;
pub mod reservation;
pub mod subscription;
pub mod user;

pub use availability::{AvailabilityDay, AvailabilityExportRequest, Slot, SlotLevel};
pub use business_hours::BusinessHoursStatus;
pub use invoice::{
    Invoice, InvoiceDetail, InvoiceError, InvoiceLine, InvoiceRequest, InvoiceSummary, InvoiceSummaryView,
    SavedInvoice, StoredInvoice,
};
pub use payment::{CreatedPreference, PaymentInfo, Preference, PreferenceRequest, WebhookNotification};
pub use product::{Product, ProductView};
pub use reservation::{CalendarExportRequest, Reservation};
pub use subscription::Subscription;
pub use user::{CurrentUser, User};
