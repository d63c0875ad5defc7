//! Local news backend - binary entry point.
//! Delegates to the library for all app logic.

#[tokio::main]
async fn main() {
    localnews_backend::run().await;
}
