use anyhow::Result;

use pathindex_cli::run;

#[tokio::main]
async fn main() -> Result<()> {
    run().await
}
