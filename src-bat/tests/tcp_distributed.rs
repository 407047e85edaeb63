use std::net::{SocketAddr, TcpListener};
use std::thread;

use bat_algo::comm::TcpTransport;
use bat_algo::{RunConfigBuilder, run_distributed, run_sequential};

#[test]
fn test_tcp_ranks_match_sequential() {
    let world = 3;
    let cfg = RunConfigBuilder::new().population(12).iterations(40).seed(31).threads(2).quiet(true).build();

    let listeners: Vec<TcpListener> = (0..world).map(|_| TcpListener::bind("127.0.0.1:0").unwrap()).collect();
    let peers: Vec<SocketAddr> = listeners.iter().map(|l| l.local_addr().unwrap()).collect();

    let handles: Vec<_> = listeners
        .into_iter()
        .enumerate()
        .map(|(rank, listener)| {
            let peers = peers.clone();
            let cfg = cfg.clone();
            thread::spawn(move || {
                let mut transport = TcpTransport::connect(rank, listener, &peers).unwrap();
                run_distributed(&mut transport, &cfg).unwrap()
            })
        })
        .collect();
    let reports: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert!(reports[1].is_none());
    assert!(reports[2].is_none());
    let dist = reports[0].as_ref().unwrap();
    let seq = run_sequential(&cfg, None).unwrap();
    assert_eq!(dist.best, seq.best);
    assert_eq!(dist.population, seq.population);
    assert_eq!(dist.procs, 3);
}
