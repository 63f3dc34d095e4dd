use rand::Rng;
use rudp::RudpSender;

const FILE_SIZE: usize = 2 * 1024 * 1024;

struct Args {
    ip: String,
    port: u16,
    auto_run: u32,
}

fn parse_args() -> Option<Args> {
    let argv: Vec<String> = std::env::args().collect();

    let mut ip = None;
    let mut port = None;
    let mut auto_run = 0u32;

    let mut i = 1;
    while i < argv.len() {
        match argv[i].as_str() {
            "-ip" => {
                i += 1;
                ip = argv.get(i).cloned();
            }
            "-p" => {
                i += 1;
                port = argv.get(i).and_then(|s| s.parse::<u16>().ok());
            }
            "-auto" => {
                i += 1;
                auto_run = argv.get(i).and_then(|s| s.parse::<u32>().ok()).unwrap_or(0);
            }
            _ => {}
        }
        i += 1;
    }

    Some(Args {
        ip: ip?,
        port: port?,
        auto_run,
    })
}

fn generate_random_data(size: usize) -> Vec<u8> {
    let mut rng = rand::thread_rng();
    (0..size).map(|_| rng.gen()).collect()
}

fn main() {
    let args = match parse_args() {
        Some(args) => args,
        None => {
            eprintln!("usage: rudp-sender -ip <addr> -p <port> [-auto <n>]");
            std::process::exit(1);
        }
    };

    println!("IP: {}", args.ip);
    println!("Port: {}", args.port);
    if args.auto_run != 0 {
        println!("Auto run: {}", args.auto_run);
    }

    println!("Connecting to {}:{}...", args.ip, args.port);
    let mut sender = match RudpSender::open_sender(&args.ip, args.port) {
        Ok(sender) => sender,
        Err(e) => {
            println!("Failed to open sender: {e}");
            std::process::exit(1);
        }
    };
    println!("Successfully connected to the receiver!");

    let message = generate_random_data(FILE_SIZE);

    let runs = args.auto_run.max(1);
    for _ in 0..runs {
        match sender.send(&message) {
            Ok(bytes_sent) => println!("Sent {bytes_sent} bytes to the receiver!"),
            Err(e) => {
                println!("send failed: {e}");
                sender.close_sender();
                std::process::exit(1);
            }
        }
    }

    sender.close_sender();
    println!("Connection closed!");
}
