use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    faultloc_cli::main_entry().await
}
