use slashdot_tui::app::{Args, USAGE};

fn main() {
    let args = match Args::parse(std::env::args().skip(1)) {
        Ok(args) => args,
        Err(err) => {
            eprintln!("error: {err}\n\n{USAGE}");
            std::process::exit(2);
        }
    };

    if args.version {
        println!("slashdot-tui {}", slashdot_tui::VERSION);
        return;
    }
    if args.help {
        println!("{USAGE}");
        return;
    }

    if let Err(err) = slashdot_tui::run(args) {
        eprintln!("error: {err:?}");
        std::process::exit(1);
    }
}
