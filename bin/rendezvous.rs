use futures::StreamExt;
use log::{error, info};
use rendezvous::Server;
use signal_hook::consts::{SIGINT, SIGTERM};
use signal_hook_tokio::Signals;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    env_logger::init();

    let args = lapp::parse_args(
        "
        Welcome to the `Rendezvous` server bootstrapper.

        Required arguments:
          <port> (integer) port to which to bind the `Rendezvous` server
          <expected_peers> (integer) number of peers to wait for
        ",
    );

    let port = args.get_integer("port") as u16;
    let expected_peers = args.get_integer("expected_peers");

    if expected_peers <= 0 {
        println!("Please expect at least one peer.");
        return;
    }

    println!("Starting `Rendezvous` server..");

    let server = Server::bind(
        ("0.0.0.0", port),
        expected_peers as usize,
        Default::default(),
    )
    .await
    .unwrap();

    println!(" .. done! `Rendezvous` server running!");
    println!("\n    [Hit Ctrl + C to stop this daemon]");

    let mut signals = Signals::new(&[SIGTERM, SIGINT]).unwrap();
    let handle = signals.handle();

    let shutdown = async move {
        signals.next().await;
        info!("`Ctrl + C` detected, shutting down..");
    };

    if let Err(error) = server.run(shutdown).await {
        error!("`Rendezvous` server stopped: {:?}", error);
    }

    handle.close();
}
