pub mod receive_invoice_command;

pub use receive_invoice_command::{InvoiceLine, ReceiveInvoiceCommand};
