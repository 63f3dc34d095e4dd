use std::time::Instant;

use rudp::{RecvOutcome, RudpReceiver};

const BUFFER_SIZE: usize = 2 * 1024 * 1024;

struct Args {
    port: u16,
    format: bool,
}

fn parse_args() -> Option<Args> {
    let argv: Vec<String> = std::env::args().collect();

    let mut port = None;
    let mut format = false;

    let mut i = 1;
    while i < argv.len() {
        match argv[i].as_str() {
            "-p" => {
                i += 1;
                port = argv.get(i).and_then(|s| s.parse::<u16>().ok());
            }
            "-format" => format = true,
            _ => {}
        }
        i += 1;
    }

    Some(Args { port: port?, format })
}

fn main() {
    let args = match parse_args() {
        Some(args) => args,
        None => {
            eprintln!("usage: rudp-receiver -p <port> [-format]");
            std::process::exit(1);
        }
    };

    if !args.format {
        println!("Port: {}", args.port);
    }

    let mut receiver = match RudpReceiver::open_receiver(args.port) {
        Ok(receiver) => receiver,
        Err(e) => {
            eprintln!("Failed to open receiver: {e}");
            std::process::exit(1);
        }
    };

    let mut run = 0u64;
    let mut times_ms = Vec::new();
    let mut buffer = vec![0u8; BUFFER_SIZE];

    loop {
        let start = Instant::now();
        let mut amount_received = 0usize;
        let mut closed = false;

        while amount_received < BUFFER_SIZE {
            match receiver.recv(&mut buffer[amount_received..]) {
                Ok(RecvOutcome::Data(n)) => amount_received += n,
                Ok(RecvOutcome::Closed) => {
                    closed = true;
                    break;
                }
                Err(e) => {
                    eprintln!("Failed to receive from sender: {e}");
                    receiver.close_receiver();
                    std::process::exit(1);
                }
            }
        }

        let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
        if !args.format {
            println!("Time taken to receive that message: {elapsed_ms} ms");
        }
        times_ms.push(elapsed_ms);

        if args.format {
            let megabytes = amount_received as f64 / (1024.0 * 1024.0);
            let throughput = megabytes / (elapsed_ms / 1000.0);
            println!("{run},{elapsed_ms},{throughput}");
            run += 1;
        }

        if closed {
            if !args.format {
                println!("Sender finished!");
            }
            receiver.close_receiver();
            let avg = times_ms.iter().sum::<f64>() / times_ms.len() as f64;
            if !args.format {
                println!("Average time taken to receive a message: {avg}");
            }
            return;
        }
    }
}
