use clap::Parser;
use fixtures::{run_server, x_api, FixtureArgs};

/// X OAuth + API fixture server
#[derive(Parser, Debug)]
#[clap(name = "x-api-fixture")]
struct Cli {
    #[clap(flatten)]
    common: FixtureArgs,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Cli::parse();

    let state = x_api::MockX::default();

    run_server(args.common, x_api::router(state)).await
}
