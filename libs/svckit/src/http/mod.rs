pub mod otel;
