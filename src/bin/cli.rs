//! Devconf command line interface.

use std::process;

use clap::{
    crate_authors, crate_description, crate_name, crate_version, value_t, App, AppSettings::*, Arg,
};
use console::style;
use log::{debug, trace, LevelFilter};
use serialport::{DataBits, FlowControl, Parity, StopBits};
use simplelog::*;

use devconf::{self as dc, ConsoleOperator, Provisioner, RequestKind, SerialTransport, Variant};

/// Exit code when the operator cancelled.
const EXIT_CANCELLED: i32 = 2;

fn main() {
    println!("[DC] devconf v{}", crate_version!());

    ctrlc::set_handler(move || {
        println!("🛑 received Ctrl+C!");
        process::exit(EXIT_CANCELLED);
    })
    .expect("Failed to install my Ctrl-C handler!");

    let matches = App::new(crate_name!())
        .version(format!("v{}", crate_version!()).as_str())
        .author(crate_authors!())
        .about(crate_description!())
        .long_about(
            "\n\
            Devconf writes an Azure IoT Hub device connection string or a DPS \
            unique device secret (UDS) to a DevKit board, using the \
            configuration console the board firmware exposes on its USB \
            serial port.\n\
            \n\
            The board is found from the USB identifiers of its serial \
            interface unless a port is given. To accept the settings, the \
            board must be in configuration mode: hold down button A, then \
            push and release the reset button.\n\
            \n\
            Two protocol variants exist: \n\
               \t* echo: probe the console and wait until it lists the \
                  `set_*` commands before sending \n\
               \t* blind: show how to enter configuration mode, then \
                  send in paced chunks once the message is dismissed \n\
            \n\
            By default, the echo variant is used on Windows and the blind \
            variant elsewhere.\
        ",
        )
        .max_term_width(80)
        .setting(ColoredHelp)
        .setting(NextLineHelp)
        .arg(
            Arg::with_name("DEVICE_TTY")
                .help("the USB tty device to use")
                .long_help(
                    "the USB tty device to use; when not set, the port is \
                     located from the board's USB vendor and product ids.",
                )
                .short("-t")
                .long("--tty")
                .takes_value(true)
                .require_equals(true),
        )
        .arg(
            Arg::with_name("BOARD")
                .help("the board to configure")
                .long("--board")
                .takes_value(true)
                .possible_values(
                    &dc::board::boards()
                        .iter()
                        .map(|board| board.id)
                        .collect::<Vec<_>>(),
                )
                .default_value(dc::board::DEFAULT_BOARD)
                .require_equals(true),
        )
        .arg(
            Arg::with_name("BAUD_RATE")
                .help("serial port baud rate")
                .long_help("serial baud rate; defaults to the board's console baud rate")
                .short("-b")
                .long("--baud-rate")
                .takes_value(true)
                .require_equals(true),
        )
        .arg(
            Arg::with_name("DATA_BITS")
                .help("number of bits per character")
                .short("-d")
                .long("--data-bits")
                .takes_value(true)
                .possible_values(&["5", "6", "7", "8"])
                .default_value("8")
                .require_equals(true),
        )
        .arg(
            Arg::with_name("STOP_BITS")
                .help("number of stop bits per byte")
                .short("-s")
                .long("--stop-bits")
                .takes_value(true)
                .possible_values(&["1", "2"])
                .default_value("1")
                .require_equals(true),
        )
        .arg(
            Arg::with_name("PARITY")
                .help("parity checking protocol")
                .short("-p")
                .long("--parity")
                .takes_value(true)
                .possible_values(&["none", "odd", "even"])
                .default_value("none")
                .require_equals(true),
        )
        .arg(
            Arg::with_name("FLOW_CONTROL")
                .help("flow control mode")
                .short("-f")
                .long("--flow-control")
                .takes_value(true)
                .possible_values(&["none", "soft", "hard"])
                .default_value("none")
                .require_equals(true),
        )
        .arg(
            Arg::with_name("MODE")
                .help("protocol variant")
                .long_help(
                    "protocol variant; `auto` picks `echo` on Windows and \
                     `blind` on other systems.",
                )
                .short("-m")
                .long("--mode")
                .takes_value(true)
                .possible_values(&["auto", "echo", "blind"])
                .default_value("auto")
                .require_equals(true),
        )
        .arg(
            Arg::with_name("WAIT")
                .help("wait for the board to be plugged in")
                .short("-w")
                .long("--wait"),
        )
        .arg(
            Arg::with_name("CONNECTION_STRING")
                .help("a stored device connection string to offer")
                .long("--connection-string")
                .env("IOTHUB_DEVICE_CONNECTION_STRING")
                .hide_env_values(true)
                .takes_value(true)
                .require_equals(true),
        )
        .arg(
            Arg::with_name("KIND")
                .help("what to write to the board")
                .long_help(
                    "what to write to the board; when not set, `devconf` \
                     asks for it.",
                )
                .possible_values(&["connection-string", "uds"])
                .index(1),
        )
        .arg(Arg::with_name("v").short("v").multiple(true).help(
            "Sets the logging level of verbosity, repeat several times for \
                higher verbosity",
        ))
        .get_matches();

    // Vary the output based on how many times the user used the "verbose" flag
    // (i.e. 'devconf -v -v -v' or 'devconf -vvv' vs 'devconf -v'
    let log_level = match matches.occurrences_of("v") {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };

    TermLogger::init(log_level, Config::default(), TerminalMode::Mixed).unwrap();

    // Arguments with default values ===========================================

    // It's safe to call unwrap on all command line arguments with default
    // values, because the value with either be what the user input at runtime
    // or the default value

    let data_bits = match matches.value_of("DATA_BITS").unwrap() {
        "5" => DataBits::Five,
        "6" => DataBits::Six,
        "7" => DataBits::Seven,
        "8" => DataBits::Eight,
        _ => unreachable!(),
    };

    let stop_bits = match matches.value_of("STOP_BITS").unwrap() {
        "1" => StopBits::One,
        "2" => StopBits::Two,
        _ => unreachable!(),
    };

    let parity = match matches.value_of("PARITY").unwrap() {
        "none" => Parity::None,
        "even" => Parity::Even,
        "odd" => Parity::Odd,
        _ => unreachable!(),
    };

    let flow_control = match matches.value_of("FLOW_CONTROL").unwrap() {
        "none" => FlowControl::None,
        "soft" => FlowControl::Software,
        "hard" => FlowControl::Hardware,
        _ => unreachable!(),
    };

    // END - Arguments with default values =====================================

    let mut builder = dc::SettingsBuilder::default()
        .board(matches.value_of("BOARD").unwrap())
        .data_bits(data_bits)
        .stop_bits(stop_bits)
        .parity(parity)
        .flow_control(flow_control)
        .wait_for_device(matches.is_present("WAIT"));

    // START - Arguments with NO default values ================================

    if matches.is_present("BAUD_RATE") {
        let baud_rate = value_t!(matches.value_of("BAUD_RATE"), u32).unwrap_or_else(|_| {
            println!(
                "{}: `{}` needs to be a numeric value",
                style("error").red(),
                style("baud-rate").cyan()
            );
            println!(
                "   {} `{}` is not a valid value",
                style("-->").cyan(),
                style(matches.value_of("BAUD_RATE").unwrap()).on_red()
            );
            process::exit(1);
        });
        builder = builder.baud_rate(baud_rate);
    }

    if let Some(path) = matches.value_of("DEVICE_TTY") {
        builder = builder.path(path);
    }

    // `auto` leaves the choice to the host OS.
    if matches.value_of("MODE") != Some("auto") {
        let variant = value_t!(matches.value_of("MODE"), Variant).unwrap_or_else(|e| {
            println!("{}: {}", style("error").red(), e.message);
            process::exit(1);
        });
        builder = builder.variant(variant);
    }

    if let Some(connection_string) = matches.value_of("CONNECTION_STRING") {
        builder = builder.connection_string(connection_string);
    }

    match matches.value_of("KIND") {
        Some("connection-string") => builder = builder.kind(RequestKind::ConnectionString),
        Some("uds") => builder = builder.kind(RequestKind::UniqueDeviceSecret),
        _ => {}
    }

    // END - Arguments =========================================================

    let settings = builder.finalize();
    trace!(
        "board {}, port {:?}, variant {:?}, kind {:?}",
        settings.board,
        settings.path,
        settings.variant,
        settings.kind
    );

    // Run the state machine ===================================================

    let mut transport = SerialTransport::new();
    let mut operator = ConsoleOperator::new();
    let exit_code = match Provisioner::new(&settings, &mut transport, &mut operator).run() {
        Ok(true) => 0,
        Ok(false) => EXIT_CANCELLED,
        Err(_) => 1,
    };
    debug!("exit code: {}", exit_code);
    process::exit(exit_code);
}
