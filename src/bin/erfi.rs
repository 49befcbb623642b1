//! erfi CLI: XML <-> Fast Infoset conversion.

use clap::{Args, Parser, Subcommand, ValueEnum};
use erfi::{CharacterEncoding, Declaration, DecoderConfig, EncoderConfig};
use std::fs::File;
use std::io::{BufReader, BufWriter, IsTerminal, Read, Write};
use std::process;

#[derive(Parser)]
#[command(name = "erfi", about = "XML <-> Fast Infoset conversion")]
struct Cli {
    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Encode XML to Fast Infoset
    Encode(EncodeArgs),
    /// Decode Fast Infoset to XML
    Decode(IoArgs),
}

#[derive(Args)]
struct IoArgs {
    /// Input file (- for stdin)
    #[arg(short, long, default_value = "-")]
    input: String,

    /// Output file (optional; without -o auto-derived, -o - = stdout)
    #[arg(short, long)]
    output: Option<String>,
}

#[derive(Args)]
struct EncodeArgs {
    #[command(flatten)]
    io: IoArgs,

    /// XML declaration written before the binary header
    #[arg(long, value_enum)]
    declaration: Option<DeclarationArg>,

    /// Write literal strings as UTF-16 instead of UTF-8
    #[arg(long)]
    utf16: bool,

    /// Values up to this many characters are indexed
    #[arg(long)]
    value_length_limit: Option<usize>,
}

#[derive(Clone, Copy, ValueEnum)]
enum DeclarationArg {
    Finf,
    FinfStandaloneNo,
    FinfStandaloneYes,
    V10,
    V10StandaloneNo,
    V10StandaloneYes,
    V11,
    V11StandaloneNo,
    V11StandaloneYes,
}

impl From<DeclarationArg> for Declaration {
    fn from(arg: DeclarationArg) -> Self {
        match arg {
            DeclarationArg::Finf => Declaration::Finf,
            DeclarationArg::FinfStandaloneNo => Declaration::FinfStandaloneNo,
            DeclarationArg::FinfStandaloneYes => Declaration::FinfStandaloneYes,
            DeclarationArg::V10 => Declaration::V10,
            DeclarationArg::V10StandaloneNo => Declaration::V10StandaloneNo,
            DeclarationArg::V10StandaloneYes => Declaration::V10StandaloneYes,
            DeclarationArg::V11 => Declaration::V11,
            DeclarationArg::V11StandaloneNo => Declaration::V11StandaloneNo,
            DeclarationArg::V11StandaloneYes => Declaration::V11StandaloneYes,
        }
    }
}

impl EncodeArgs {
    fn to_config(&self) -> EncoderConfig {
        let mut config = EncoderConfig::default();
        if let Some(declaration) = self.declaration {
            config = config.with_declaration(declaration.into());
        }
        if self.utf16 {
            config = config.with_character_encoding(CharacterEncoding::Utf16);
        }
        if let Some(limit) = self.value_length_limit {
            config = config.with_value_length_limit(limit);
        }
        config
    }
}

fn main() {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    env_logger::Builder::from_default_env().filter_level(level).init();

    if let Err(e) = run(cli) {
        eprintln!("Fehler: {e}");
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), String> {
    match cli.command {
        Command::Encode(args) => run_encode(args),
        Command::Decode(args) => run_decode(args),
    }
}

fn run_encode(args: EncodeArgs) -> Result<(), String> {
    let output_path = resolve_output_path(args.io.output.as_deref(), &args.io.input, "finf")?;
    let config = args.to_config();
    let input = open_input(&args.io.input)?;
    log::info!("encode {} -> {}", args.io.input, output_path);
    write_to_output(&output_path, |writer| {
        let mut writer = erfi::encode_xml_to(input, writer, config)
            .map_err(|e| format!("Encode-Fehler: {e}"))?;
        writer.flush().map_err(|e| format!("Schreibfehler: {e}"))
    })
}

fn run_decode(args: IoArgs) -> Result<(), String> {
    let output_path = resolve_output_path(args.output.as_deref(), &args.input, "xml")?;
    let input = open_input(&args.input)?;
    log::info!("decode {} -> {}", args.input, output_path);
    write_to_output(&output_path, |writer| {
        let mut writer = erfi::decode_to_writer(input, writer, DecoderConfig::default())
            .map_err(|e| format!("Decode-Fehler: {e}"))?;
        writer.flush().map_err(|e| format!("Schreibfehler: {e}"))
    })
}

/// Oeffnet die Eingabe gepuffert; "-" liest von stdin.
fn open_input(path: &str) -> Result<Box<dyn Read>, String> {
    if path == "-" {
        if std::io::stdin().is_terminal() {
            eprintln!("Lese von stdin (Ctrl+D zum Beenden)...");
        }
        return Ok(Box::new(BufReader::new(std::io::stdin())));
    }
    let file = File::open(path).map_err(|e| format!("Lesefehler '{path}': {e}"))?;
    Ok(Box::new(BufReader::new(file)))
}

fn create_buf_writer(path: &str) -> Result<BufWriter<Box<dyn Write>>, String> {
    if path == "-" {
        Ok(BufWriter::new(Box::new(std::io::stdout().lock())))
    } else {
        let file = File::create(path).map_err(|e| format!("Schreibfehler '{path}': {e}"))?;
        Ok(BufWriter::new(Box::new(file)))
    }
}

/// Schreibt Output entweder nach stdout ("-") oder atomar in eine Datei (tmp+rename).
fn write_to_output(
    output_path: &str,
    write_fn: impl FnOnce(BufWriter<Box<dyn Write>>) -> Result<(), String>,
) -> Result<(), String> {
    if output_path == "-" {
        return write_fn(create_buf_writer("-")?);
    }

    let tmp_path = format!("{output_path}.tmp");
    let writer = create_buf_writer(&tmp_path)?;
    if let Err(e) = write_fn(writer) {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(e);
    }
    std::fs::rename(&tmp_path, output_path).map_err(|e| format!("Rename-Fehler: {e}"))
}

fn resolve_output_path(explicit: Option<&str>, input: &str, ext: &str) -> Result<String, String> {
    if let Some(path) = explicit {
        return Ok(path.to_string());
    }
    if input == "-" {
        return Ok("-".into());
    }
    let path = std::path::Path::new(input);
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| "ungueltiger Eingabepfad".to_string())?;
    let parent = path.parent().unwrap_or_else(|| std::path::Path::new(""));
    Ok(parent.join(format!("{stem}.{ext}")).to_string_lossy().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_cli(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).expect("CLI parse failed")
    }

    #[test]
    fn encode_flags() {
        let cli = parse_cli(&[
            "erfi", "-vv", "encode", "-i", "doc.xml", "--declaration", "v10-standalone-yes", "--utf16",
        ]);
        assert_eq!(cli.verbose, 2);
        let Command::Encode(args) = cli.command else {
            panic!("expected encode");
        };
        let config = args.to_config();
        assert_eq!(config.declaration, Some(Declaration::V10StandaloneYes));
        assert_eq!(config.character_encoding, CharacterEncoding::Utf16);
    }

    #[test]
    fn decode_defaults_to_stdin() {
        let cli = parse_cli(&["erfi", "decode"]);
        let Command::Decode(args) = cli.command else {
            panic!("expected decode");
        };
        assert_eq!(args.input, "-");
        assert_eq!(resolve_output_path(None, &args.input, "xml").unwrap(), "-");
    }

    #[test]
    fn output_path_derived_from_input() {
        let path = resolve_output_path(None, "dir/doc.xml", "finf").unwrap();
        assert_eq!(path, std::path::Path::new("dir").join("doc.finf").to_string_lossy());
        assert_eq!(resolve_output_path(Some("x.bin"), "doc.xml", "finf").unwrap(), "x.bin");
    }

    #[test]
    fn unknown_declaration_rejected() {
        assert!(Cli::try_parse_from(["erfi", "encode", "--declaration", "v12"]).is_err());
    }
}
