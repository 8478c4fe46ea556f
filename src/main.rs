use clap::Parser;

#[derive(Parser)]
#[command(name = "revamp")]
#[command(about = "System inventory, protection and update intelligence service")]
struct Cli {
    /// Port for the HTTP server; overrides PORT from the environment
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    revamp::server::run_server(cli.port).await
}
