use log::info;
use rendezvous::Peer;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    env_logger::init();

    let args = lapp::parse_args(
        "
        Welcome to the `Rendezvous` peer.

        Required arguments:
          <rendezvous_address> (string) address of `Rendezvous` server
          <name> (string) name under which to register
          --skip-done register only, do not report done
        ",
    );

    let rendezvous_address = args.get_string("rendezvous_address");
    let name = args.get_string("name");
    let skip_done = args.get_bool("skip-done");

    info!("Connecting to `Rendezvous` server at {}..", rendezvous_address);

    let mut peer = Peer::connect(rendezvous_address, name, Default::default())
        .await
        .unwrap();

    info!("Waiting for every peer to register..");

    let addresses = peer.register().await.unwrap();

    for (name, host) in addresses.iter() {
        let marker = if name == peer.name() { " (self)" } else { "" };
        println!("{} {}{}", name, host, marker);
    }

    if skip_done {
        return;
    }

    info!("Waiting for every peer to be done..");

    peer.done().await.unwrap();

    println!("all done");
}
