use clap::{Arg, ArgMatches, Command};
use gmt::config::{sample_template, Config, SAMPLE_CONFIG, VERSION};
use gmt::{send_all, synthesize_all, CommandTransport, ResolvedMessage, Synthesis};
use log::LevelFilter;
use std::process;
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() {
    let matches = Command::new("gmt")
        .version(VERSION)
        .about("Sends emails in bulk based on a template and a config file")
        .arg(
            Arg::new("config-path")
                .short('c')
                .long("config-path")
                .value_name("FILE")
                .help("Path to the config file"),
        )
        .arg(
            Arg::new("template-path")
                .short('t')
                .long("template-path")
                .value_name("FILE")
                .help("Path to the template file"),
        )
        .arg(
            Arg::new("dry-run")
                .long("dry-run")
                .help("Show what would be done but execute no action")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .help("Print the dry run as JSON")
                .requires("dry-run")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("sample-config")
                .long("sample-config")
                .help("Output sample configuration to stdout")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("sample-template")
                .long("sample-template")
                .help("Output sample template to stdout")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("generate-config")
                .long("generate-config")
                .value_name("FILE")
                .help("Write a default configuration file")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable debug logging")
                .action(clap::ArgAction::SetTrue),
        )
        .get_matches();

    let log_level = if matches.get_flag("verbose") {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    if matches.get_flag("sample-config") {
        println!("{SAMPLE_CONFIG}");
        return;
    }

    if matches.get_flag("sample-template") {
        println!("{}", sample_template(VERSION));
        return;
    }

    if let Some(path) = matches.get_one::<String>("generate-config") {
        generate_default_config(path);
        return;
    }

    let (config, template) = load_inputs(&matches);
    let global = config.global_message(&template);
    log::debug!("Using {} for {} recipient line(s)", global.dialect, config.recipients.len());

    let synthesis = synthesize_all(&global, &config.recipients);
    for skipped in &synthesis.skipped {
        eprintln!(
            "!! Skipping recipient line {} ({}): {}",
            skipped.line_no, skipped.error, skipped.line
        );
    }

    if matches.get_flag("dry-run") {
        if matches.get_flag("json") {
            print_json(&synthesis);
        } else {
            for message in &synthesis.messages {
                print_dry_run(message);
            }
        }
        return;
    }

    let transport = Arc::new(CommandTransport::new(Duration::from_secs(
        config.send_timeout_seconds,
    )));

    println!("\nSending emails now..");
    let report = send_all(transport, synthesis.messages).await;
    for recipient in &report.sent {
        println!("-> {recipient}");
    }
    for failure in &report.failed {
        println!("!! Error sending to {} ({})", failure.recipient, failure.error);
    }

    if !report.is_success() {
        process::exit(6);
    }
}

fn load_inputs(matches: &ArgMatches) -> (Config, String) {
    let Some(config_path) = matches.get_one::<String>("config-path") else {
        eprintln!("*** Error: please specify config file!");
        process::exit(1);
    };
    let Some(template_path) = matches.get_one::<String>("template-path") else {
        eprintln!("*** Error: please specify template file!");
        process::exit(2);
    };

    let content = match std::fs::read_to_string(config_path) {
        Ok(content) => content,
        Err(e) => {
            eprintln!("Failed to read config file!");
            eprintln!("{e}");
            process::exit(3);
        }
    };

    let config = match Config::parse(&content) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error in config file!");
            eprintln!("{e}");
            process::exit(4);
        }
    };

    let template = match std::fs::read_to_string(template_path) {
        Ok(template) => template,
        Err(e) => {
            eprintln!("Failed to read template file!");
            eprintln!("{e}");
            process::exit(5);
        }
    };

    (config, template)
}

fn generate_default_config(path: &str) {
    match Config::default().to_file(path) {
        Ok(()) => {
            println!("Default configuration written to: {path}");
            println!("Please edit the configuration file to suit your needs.");
        }
        Err(e) => {
            eprintln!("Error writing configuration file: {e}");
            process::exit(1);
        }
    }
}

fn print_dry_run(message: &ResolvedMessage) {
    let cmdline: Vec<String> = message.invocation.iter().map(|a| shell_quote(a)).collect();
    println!(
        "--\n{}\nTo: {}\nSubject: {}\n{}",
        cmdline.join(" "),
        message.recipient,
        message.subject,
        message.body
    );
}

fn print_json(synthesis: &Synthesis) {
    match serde_json::to_string_pretty(synthesis) {
        Ok(json) => println!("{json}"),
        Err(e) => {
            eprintln!("Error serializing dry run: {e}");
            process::exit(1);
        }
    }
}

/// Quotes an argument for display only; the mail program is never run
/// through a shell.
fn shell_quote(arg: &str) -> String {
    let plain = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "@%+=:,./_-".contains(c));
    if plain {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', r"'\''"))
    }
}
