use clap::Parser;
use spot_mcp_server::{build_server, logging, ServerArgs};
use tokio::io::BufReader;

#[tokio::main(flavor = "multi_thread")]
async fn main() {
    let args = ServerArgs::parse();
    logging::init(args.log_format);

    let (config, policy) = args.resolve();
    let server = match build_server(config, policy) {
        Ok(server) => server,
        Err(e) => {
            eprintln!("fatal: {e:?}");
            std::process::exit(2);
        }
    };

    let stdin = BufReader::new(tokio::io::stdin());
    if let Err(e) = server.run(stdin, tokio::io::stdout()).await {
        tracing::error!(error = ?e, "server stopped");
        std::process::exit(1);
    }
}
