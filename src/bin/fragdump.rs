//! CLI tool for inspecting XML fragments.
//!
//! Parses XML fragment content from files or stdin and re-emits it:
//! serialized (optionally pretty-printed), or as a textual tree dump
//! produced through the accessor interface.

use std::fmt::Write as _;
use std::fs;
use std::io::{self, Read, Write};
use std::process::ExitCode;
use std::time::Instant;

use clap::Parser;

use xmlfrag::accessor::{AccessorNodeType, FragmentAccessor, TreeAccessor};
use xmlfrag::fragment::XmlFragment;
use xmlfrag::parser::ParseOptions;
use xmlfrag::serial::{serialize_tree, SerializeOptions};

// ---------------------------------------------------------------------------
// CLI argument definitions
// ---------------------------------------------------------------------------

/// fragdump -- parse and dump XML fragment content.
#[derive(Parser, Debug)]
#[command(name = "fragdump", version, about, long_about = None)]
struct Cli {
    /// XML files to process (use `-` for stdin).
    #[arg(required = true)]
    files: Vec<String>,

    /// Recover from parsing errors (produce a partial tree).
    #[arg(long)]
    recover: bool,

    /// Maximum element nesting depth accepted while parsing.
    #[arg(long, value_name = "N")]
    max_depth: Option<u32>,

    /// Pretty-print (indent) the output.
    #[arg(long)]
    format: bool,

    /// Emit an XML declaration when the input carried one.
    #[arg(long)]
    declaration: bool,

    /// Print a debug representation of the fragment tree.
    #[arg(long)]
    debug: bool,

    /// Do not output the result tree.
    #[arg(long)]
    noout: bool,

    /// Save output to a file instead of stdout.
    #[arg(long, value_name = "FILE")]
    output: Option<String>,

    /// Print timing information for parsing and serialization.
    #[arg(long)]
    timing: bool,
}

const EXIT_SUCCESS: u8 = 0;
const EXIT_PARSE_ERROR: u8 = 1;

fn main() -> ExitCode {
    let cli = Cli::parse();
    let mut worst_exit = EXIT_SUCCESS;

    for file in &cli.files {
        let exit = process_file(&cli, file);
        if exit > worst_exit {
            worst_exit = exit;
        }
    }

    ExitCode::from(worst_exit)
}

/// Processes a single input file and returns an exit code.
fn process_file(cli: &Cli, filename: &str) -> u8 {
    let input = match read_input(filename) {
        Ok(data) => data,
        Err(e) => {
            eprintln!("{filename}: failed to read: {e}");
            return EXIT_PARSE_ERROR;
        }
    };

    let start_parse = Instant::now();
    let fragment = match parse_fragment(cli, &input) {
        Ok(f) => f,
        Err(msg) => {
            eprintln!("{filename}: {msg}");
            return EXIT_PARSE_ERROR;
        }
    };
    if cli.timing {
        let elapsed = start_parse.elapsed();
        eprintln!("Parsing took {elapsed:?}");
    }

    if cli.debug {
        write_output(cli, &format_debug_tree(&fragment));
        return EXIT_SUCCESS;
    }

    if !cli.noout {
        let start_serial = Instant::now();
        let mut options = SerializeOptions::new().declaration(cli.declaration);
        if cli.format {
            options = options.indent(2);
        }
        let mut output = serialize_tree(&FragmentAccessor::new(&fragment), &options);
        if !output.ends_with('\n') {
            output.push('\n');
        }
        write_output(cli, &output);
        if cli.timing {
            let elapsed = start_serial.elapsed();
            eprintln!("Serializing took {elapsed:?}");
        }
    }

    EXIT_SUCCESS
}

/// Reads input from a file or stdin (when filename is `-`).
fn read_input(filename: &str) -> io::Result<Vec<u8>> {
    if filename == "-" {
        let mut buf = Vec::new();
        io::stdin().read_to_end(&mut buf)?;
        Ok(buf)
    } else {
        fs::read(filename)
    }
}

/// Parses input bytes with the configured options.
fn parse_fragment(cli: &Cli, input: &[u8]) -> Result<XmlFragment, String> {
    let mut options = ParseOptions::default().recover(cli.recover);
    if let Some(depth) = cli.max_depth {
        options = options.max_depth(depth);
    }
    let text = xmlfrag::parser::decode_to_utf8(input).map_err(|e| e.to_string())?;
    XmlFragment::parse_str_with_options(&text, &options).map_err(|e| e.to_string())
}

// ---------------------------------------------------------------------------
// Debug tree
// ---------------------------------------------------------------------------

/// Produces a textual representation of the fragment tree, one node per
/// line, indented by depth, through the accessor interface.
fn format_debug_tree(fragment: &XmlFragment) -> String {
    let accessor = FragmentAccessor::new(fragment);
    let mut output = String::new();
    output.push_str("FRAGMENT\n");
    let mut child = accessor.first_child(accessor.root());
    while let Some(node) = child {
        format_debug_node(&accessor, node, 1, &mut output);
        child = accessor.next_sibling(node);
    }
    output
}

fn format_debug_node(
    accessor: &FragmentAccessor<'_>,
    node: <FragmentAccessor<'_> as TreeAccessor>::Node,
    depth: usize,
    out: &mut String,
) {
    let indent = "  ".repeat(depth);
    match accessor.node_type(node) {
        AccessorNodeType::Root => {}
        AccessorNodeType::Element => {
            out.push_str(&indent);
            out.push_str("ELEMENT ");
            if let Some(name) = accessor.name(node) {
                out.push_str(&name.qname());
                if let Some(uri) = name.uri() {
                    let _ = write!(out, " ns={uri}");
                }
            }
            out.push('\n');
            for i in 0..accessor.attribute_count(node) {
                if let Some((attr_name, value, is_id)) = accessor.attribute(node, i) {
                    out.push_str(&indent);
                    out.push_str("  ATTRIBUTE ");
                    out.push_str(&attr_name.qname());
                    out.push('=');
                    out.push_str(&value);
                    if is_id {
                        out.push_str(" (id)");
                    }
                    out.push('\n');
                }
            }
            let mut child = accessor.first_child(node);
            while let Some(current) = child {
                format_debug_node(accessor, current, depth + 1, out);
                child = accessor.next_sibling(current);
            }
        }
        AccessorNodeType::Text => {
            out.push_str(&indent);
            out.push_str("TEXT ");
            let display = accessor.data(node).unwrap_or_default().replace('\n', "\\n");
            out.push_str(&display);
            out.push('\n');
        }
        AccessorNodeType::CData => {
            out.push_str(&indent);
            out.push_str("CDATA ");
            out.push_str(&accessor.data(node).unwrap_or_default());
            out.push('\n');
        }
        AccessorNodeType::Comment => {
            out.push_str(&indent);
            out.push_str("COMMENT ");
            out.push_str(&accessor.data(node).unwrap_or_default());
            out.push('\n');
        }
        AccessorNodeType::ProcessingInstruction => {
            out.push_str(&indent);
            out.push_str("PI ");
            if let Some(name) = accessor.name(node) {
                out.push_str(name.local());
            }
            let data = accessor.data(node).unwrap_or_default();
            if !data.is_empty() {
                out.push(' ');
                out.push_str(&data);
            }
            out.push('\n');
        }
    }
}

/// Writes output to stdout or to the file specified by --output.
fn write_output(cli: &Cli, content: &str) {
    if let Some(ref output_file) = cli.output {
        if let Err(e) = fs::write(output_file, content) {
            eprintln!("{output_file}: failed to write: {e}");
        }
    } else {
        print!("{content}");
        let _ = io::stdout().flush();
    }
}
