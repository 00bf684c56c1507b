use solink::{run_link, LinkOptions};

const USAGE: &str = "\
usage: solink -o <output.so> [options] <input.o|input.a>...

options:
  -o <path>     output shared object path (required)
  -b <addr>     base virtual address, hex (default 0x04000000)
  -e <file>     export definition file (.def)
  -v            verbose statistics
  -h, --help    show this help";

/// Parse a hex address, with or without a 0x prefix.
fn parse_address(s: &str) -> Result<u64, String> {
    let digits = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")).unwrap_or(s);
    u64::from_str_radix(digits, 16).map_err(|_| format!("bad address '{}'", s))
}

fn parse_args(args: &[String]) -> Result<LinkOptions, String> {
    let mut output_path: Option<String> = None;
    let mut base_addr: u64 = 0x0400_0000;
    let mut def_path: Option<String> = None;
    let mut verbose = false;
    let mut inputs = Vec::new();

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "-o" => {
                i += 1;
                output_path = Some(
                    args.get(i).ok_or("-o requires an argument")?.clone(),
                );
            }
            "-b" => {
                i += 1;
                base_addr = parse_address(args.get(i).ok_or("-b requires an argument")?)?;
            }
            "-e" => {
                i += 1;
                def_path = Some(args.get(i).ok_or("-e requires an argument")?.clone());
            }
            "-v" => verbose = true,
            "-h" | "--help" => {
                println!("{}", USAGE);
                std::process::exit(0);
            }
            opt if opt.starts_with('-') => {
                return Err(format!("unknown option '{}'", opt));
            }
            path => inputs.push(path.to_string()),
        }
        i += 1;
    }

    let output_path = output_path.ok_or("no output path (use -o)")?;
    if inputs.is_empty() {
        return Err("no input files".to_string());
    }

    Ok(LinkOptions { output_path, base_addr, def_path, verbose, inputs })
}

fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.is_empty() {
        eprintln!("{}", USAGE);
        std::process::exit(1);
    }

    let opts = match parse_args(&args) {
        Ok(opts) => opts,
        Err(e) => {
            eprintln!("solink: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = run_link(&opts) {
        eprintln!("solink: {}", e);
        std::process::exit(1);
    }
}
