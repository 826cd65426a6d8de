// Thin delegating binary.
//
// The actual server assembly lives in the `quickstart-server` crate.
#[actix_rt::main]
async fn main() -> std::io::Result<()> {
    quickstart_server::run().await
}
