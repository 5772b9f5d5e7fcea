use std::time::Duration;

use super::*;
use crate::{
    board,
    error::Error,
    testing::{MockTransport, ScriptedOperator},
    transport::TransportEvent,
    SettingsBuilder,
};

const SHORT_CS: &str = "HostName=a;DeviceId=b;SharedAccessKey=c";

const MENU: &str = "# help\r\n# Configuration console:\r\n #  - set_az_iothub: Set the connection \
                    string of Azure IoT Hub.\r\n # - set_dps_uds: Set DPS UDS.\r\n";

fn long_cs() -> String {
    format!(
        "HostName=contoso-hub.azure-devices.net;DeviceId=devkit-0001;SharedAccessKey={}",
        "k".repeat(120)
    )
}

fn fast(variant: Variant) -> SettingsBuilder {
    SettingsBuilder::new()
        .variant(variant)
        .reprompt_after(Duration::from_millis(20))
        .chunk_delay(Duration::from_millis(1))
        .settle_delay(Duration::from_millis(1))
}

fn data(text: &str) -> TransportEvent {
    TransportEvent::Data(text.as_bytes().to_vec())
}

fn run(
    settings: &Settings,
    request: &ProvisioningRequest,
    transport: &mut MockTransport,
    operator: &mut ScriptedOperator,
) -> Result<()> {
    let board = board::lookup("devkit").unwrap();
    configure_device(settings, board, "COM5", request, transport, operator)
}

// -----------------------------------------------------------------------------
// Chunking
// -----------------------------------------------------------------------------

#[test]
fn echo_short_command_is_one_chunk() {
    let command = vec![b'x'; ECHO_CHUNK_LIMIT];
    let plan = ChunkPlan::echo(&command, Duration::from_secs(1), Duration::from_secs(1));
    assert_eq!(plan.chunks, vec![command]);
    assert_eq!(plan.pause_between_chunks(), Duration::from_secs(0));
}

#[test]
fn echo_long_command_is_head_and_remainder() {
    let command: Vec<u8> = (0..250u32).map(|i| (i % 251) as u8).collect();
    let plan = ChunkPlan::echo(&command, Duration::from_secs(1), Duration::from_secs(1));
    assert_eq!(plan.chunks.len(), 2);
    assert_eq!(plan.chunks[0], &command[..ECHO_CHUNK_LIMIT]);
    assert_eq!(plan.chunks[1], &command[ECHO_CHUNK_LIMIT..]);
    assert_eq!(plan.chunks.concat(), command);
}

#[test]
fn blind_command_is_split_in_hundreds() {
    let command = vec![b'y'; 250];
    let delay = Duration::from_secs(1);
    let plan = ChunkPlan::blind(&command, delay, delay);
    let sizes: Vec<usize> = plan.chunks.iter().map(Vec::len).collect();
    assert_eq!(sizes, vec![100, 100, 50]);
    assert_eq!(plan.chunks.concat(), command);
    assert_eq!(plan.pause_between_chunks(), 2 * delay);
}

#[test]
fn plan_uses_settings_pacing() {
    let settings = SettingsBuilder::new()
        .chunk_delay(Duration::from_millis(5))
        .settle_delay(Duration::from_millis(7))
        .finalize();
    let plan = ChunkPlan::for_variant(Variant::Blind, b"set_dps_uds", &settings);
    assert_eq!(plan.inter_chunk_delay, Duration::from_millis(5));
    assert_eq!(plan.settle_delay, Duration::from_millis(7));
}

// -----------------------------------------------------------------------------
// Variant
// -----------------------------------------------------------------------------

#[test]
fn variant_follows_host_os() {
    assert_eq!(Variant::for_os("windows"), Variant::Echo);
    assert_eq!(Variant::for_os("linux"), Variant::Blind);
    assert_eq!(Variant::for_os("macos"), Variant::Blind);
}

#[test]
fn variant_from_str() {
    assert_eq!("echo".parse::<Variant>(), Ok(Variant::Echo));
    assert_eq!("blind".parse::<Variant>(), Ok(Variant::Blind));
    assert!("auto".parse::<Variant>().is_err());
}

// -----------------------------------------------------------------------------
// Session state
// -----------------------------------------------------------------------------

#[test]
fn first_outcome_wins() {
    let mut state = SessionState::new();
    assert!(!state.is_terminal());
    assert!(!state.settle(Outcome::Pending));

    assert!(state.settle(Outcome::Failure(Error::TransportClosed)));
    assert!(!state.settle(Outcome::Success));
    assert!(!state.settle(Outcome::Failure(Error::OperatorCancelled)));
    assert!(matches!(
        state.into_result(),
        Err(Error::TransportClosed)
    ));
}

#[test]
fn unsettled_session_counts_as_closed() {
    assert!(matches!(
        SessionState::new().into_result(),
        Err(Error::TransportClosed)
    ));
}

// -----------------------------------------------------------------------------
// Echo variant
// -----------------------------------------------------------------------------

#[test]
fn echo_sends_command_once_config_mode_is_seen() {
    let settings = fast(Variant::Echo).finalize();
    let request = ProvisioningRequest::connection_string(SHORT_CS).unwrap();
    let mut transport = MockTransport::new().with_responder(|_, bytes| {
        if bytes == PROBE {
            vec![data(MENU)]
        } else {
            vec![]
        }
    });
    let mut operator = ScriptedOperator::new();

    run(&settings, &request, &mut transport, &mut operator).unwrap();

    assert_eq!(transport.opened.len(), 1);
    assert_eq!(transport.opened[0].0, "COM5");
    assert_eq!(transport.opened[0].1.baud_rate, 115_200);
    assert_eq!(transport.sent[0], PROBE);
    assert_eq!(transport.commands(), vec![request.encode()]);
    assert_eq!(transport.closes, 1);
    assert!(!transport.is_open());
    assert!(operator.guidance.is_empty());
    assert!(operator
        .output
        .iter()
        .any(|line| line.starts_with("- set_az_iothub")));
    assert!(operator.output.iter().all(|line| !line.starts_with('#')));
}

#[test]
fn echo_marker_seen_twice_sends_command_once() {
    let settings = fast(Variant::Echo).finalize();
    let request = ProvisioningRequest::connection_string(SHORT_CS).unwrap();
    let mut transport = MockTransport::new().with_on_open(vec![data(MENU), data(MENU)]);
    let mut operator = ScriptedOperator::new();

    run(&settings, &request, &mut transport, &mut operator).unwrap();

    assert_eq!(transport.commands().len(), 1);
    assert_eq!(transport.closes, 1);
}

#[test]
fn echo_long_command_goes_out_in_two_chunks() {
    let settings = fast(Variant::Echo).finalize();
    let request = ProvisioningRequest::connection_string(&long_cs()).unwrap();
    let mut transport = MockTransport::new().with_on_open(vec![data(MENU)]);
    let mut operator = ScriptedOperator::new();

    run(&settings, &request, &mut transport, &mut operator).unwrap();

    // The probe, then the head and the remainder of the command.
    assert_eq!(transport.sent.len(), 3);
    assert_eq!(transport.sent[1].len(), ECHO_CHUNK_LIMIT);
    assert_eq!(transport.sent[1..].concat(), request.encode());
}

#[test]
fn echo_without_config_mode_nudges_and_probes_again() {
    let settings = fast(Variant::Echo).finalize();
    let request = ProvisioningRequest::connection_string(SHORT_CS).unwrap();
    let mut transport = MockTransport::new().with_responder(|index, _| match index {
        0 => vec![data("# Normal mode\r\n")],
        1 => vec![data(MENU)],
        _ => vec![],
    });
    let mut operator = ScriptedOperator::new();

    run(&settings, &request, &mut transport, &mut operator).unwrap();

    assert_eq!(operator.guidance, vec![ENTER_CONFIG_MODE.to_owned()]);
    assert_eq!(transport.sent[0], PROBE);
    assert_eq!(transport.sent[1], PROBE);
    assert_eq!(transport.commands(), vec![request.encode()]);
    assert_eq!(operator.output[0], "Normal mode");
}

#[test]
fn echo_silent_device_nudges_and_probes_again() {
    let settings = fast(Variant::Echo).finalize();
    let request = ProvisioningRequest::connection_string(SHORT_CS).unwrap();
    let mut transport = MockTransport::new().with_responder(|index, _| match index {
        1 => vec![data(MENU)],
        _ => vec![],
    });
    let mut operator = ScriptedOperator::new();

    run(&settings, &request, &mut transport, &mut operator).unwrap();

    assert_eq!(operator.guidance, vec![ENTER_CONFIG_MODE.to_owned()]);
    assert_eq!(transport.sent.len(), 3);
    assert_eq!(transport.sent[0], PROBE);
    assert_eq!(transport.sent[1], PROBE);
    assert_eq!(transport.sent[2], request.encode());
}

#[test]
fn echo_error_before_any_data_fails_and_closes() {
    let settings = fast(Variant::Echo).finalize();
    let request = ProvisioningRequest::connection_string(SHORT_CS).unwrap();
    let mut transport =
        MockTransport::new().with_on_open(vec![TransportEvent::Error("device unplugged".into())]);
    let mut operator = ScriptedOperator::new();

    let result = run(&settings, &request, &mut transport, &mut operator);

    match result {
        Err(Error::Transport(message)) => assert_eq!(message, "device unplugged"),
        other => panic!("unexpected result {:?}", other),
    }
    assert!(transport.commands().is_empty());
    assert_eq!(transport.closes, 1);

    // A close after the failure changes nothing.
    transport.close().unwrap();
    assert_eq!(transport.closes, 1);
}

#[test]
fn echo_close_before_command_is_a_failure() {
    let settings = fast(Variant::Echo).finalize();
    let request = ProvisioningRequest::connection_string(SHORT_CS).unwrap();
    let mut transport = MockTransport::new().with_on_open(vec![TransportEvent::Close]);
    let mut operator = ScriptedOperator::new();

    let result = run(&settings, &request, &mut transport, &mut operator);

    assert!(matches!(result, Err(Error::TransportClosed)));
    assert!(transport.commands().is_empty());
}

#[test]
fn device_reply_after_command_is_ignored() {
    let settings = fast(Variant::Echo).finalize();
    let request = ProvisioningRequest::connection_string(SHORT_CS).unwrap();
    let mut transport = MockTransport::new()
        .with_on_open(vec![data(MENU)])
        .with_responder(|_, bytes| {
            if bytes.starts_with(b"set_") {
                vec![data("# INFO: Set Azure Iot hub connection string successfully.\r\n")]
            } else {
                vec![]
            }
        });
    let mut operator = ScriptedOperator::new();

    run(&settings, &request, &mut transport, &mut operator).unwrap();
    assert_eq!(transport.closes, 1);
}

#[test]
fn port_closing_after_command_is_not_a_failure() {
    let settings = fast(Variant::Echo).finalize();
    let request = ProvisioningRequest::connection_string(SHORT_CS).unwrap();
    let mut transport = MockTransport::new()
        .with_on_open(vec![data(MENU)])
        .with_responder(|_, bytes| {
            if bytes.starts_with(b"set_") {
                vec![TransportEvent::Close]
            } else {
                vec![]
            }
        });
    let mut operator = ScriptedOperator::new();

    run(&settings, &request, &mut transport, &mut operator).unwrap();

    assert_eq!(transport.commands(), vec![request.encode()]);
    assert_eq!(transport.closes, 1);
}

#[test]
fn events_after_the_outcome_change_nothing() {
    let settings = fast(Variant::Echo).finalize();
    let request = ProvisioningRequest::connection_string(SHORT_CS).unwrap();
    let mut transport = MockTransport::new().with_on_open(vec![data(MENU)]);
    transport.on_close = vec![
        data("# INFO: Set Azure Iot hub connection string successfully.\r\n"),
        TransportEvent::Error("device unplugged".into()),
    ];
    let mut operator = ScriptedOperator::new();

    run(&settings, &request, &mut transport, &mut operator).unwrap();

    assert_eq!(transport.commands().len(), 1);
    assert_eq!(transport.closes, 1);
    assert!(operator.output.iter().all(|line| !line.starts_with("INFO")));
}

// -----------------------------------------------------------------------------
// Blind variant
// -----------------------------------------------------------------------------

#[test]
fn blind_sends_paced_chunks_after_confirmation() {
    let settings = fast(Variant::Blind).finalize();
    let request = ProvisioningRequest::connection_string(&long_cs()).unwrap();
    let mut transport = MockTransport::new().with_on_open(vec![data("# Normal mode\r\n")]);
    let mut operator = ScriptedOperator::new();
    operator.confirmations.push_back(true);

    run(&settings, &request, &mut transport, &mut operator).unwrap();

    let command = request.encode();
    let expected = (command.len() + BLIND_CHUNK_LIMIT - 1) / BLIND_CHUNK_LIMIT;
    assert_eq!(transport.sent.len(), expected);
    assert!(transport.sent.iter().all(|chunk| chunk.len() <= BLIND_CHUNK_LIMIT));
    assert_eq!(transport.sent.concat(), command);
    assert_eq!(operator.confirm_prompts, vec![CONFIRM_CONFIG_MODE.to_owned()]);
    assert!(operator.output.is_empty());
    assert_eq!(transport.closes, 1);
}

#[test]
fn blind_sends_even_when_guidance_is_declined() {
    let settings = fast(Variant::Blind).finalize();
    let request = ProvisioningRequest::connection_string(SHORT_CS).unwrap();
    let mut transport = MockTransport::new();
    let mut operator = ScriptedOperator::new();
    operator.confirmations.push_back(false);

    run(&settings, &request, &mut transport, &mut operator).unwrap();

    assert_eq!(operator.confirm_prompts, vec![CONFIRM_CONFIG_MODE.to_owned()]);
    assert_eq!(transport.sent, vec![request.encode()]);
    assert_eq!(transport.closes, 1);
}

#[test]
fn failed_chunk_write_is_not_fatal() {
    let settings = fast(Variant::Blind).finalize();
    let request = ProvisioningRequest::connection_string(&long_cs()).unwrap();
    let mut transport = MockTransport::new();
    transport.fail_send_at(1);
    let mut operator = ScriptedOperator::new();
    operator.confirmations.push_back(true);

    run(&settings, &request, &mut transport, &mut operator).unwrap();

    assert_eq!(transport.sent.len(), 1);
    assert_eq!(transport.closes, 1);
}

// -----------------------------------------------------------------------------
// Port failures
// -----------------------------------------------------------------------------

#[test]
fn open_failure_is_reported() {
    let settings = fast(Variant::Echo).finalize();
    let request = ProvisioningRequest::connection_string(SHORT_CS).unwrap();
    let mut transport = MockTransport::new();
    transport.fail_open();
    let mut operator = ScriptedOperator::new();

    let result = run(&settings, &request, &mut transport, &mut operator);

    match result {
        Err(Error::TransportOpenFailed { port, .. }) => assert_eq!(port, "COM5"),
        other => panic!("unexpected result {:?}", other),
    }
    assert!(transport.sent.is_empty());
}

#[test]
fn close_failure_does_not_change_outcome() {
    let settings = fast(Variant::Echo).finalize();
    let request = ProvisioningRequest::connection_string(SHORT_CS).unwrap();
    let mut transport = MockTransport::new().with_on_open(vec![data(MENU)]);
    transport.fail_close();
    let mut operator = ScriptedOperator::new();

    run(&settings, &request, &mut transport, &mut operator).unwrap();
    assert_eq!(transport.commands().len(), 1);
}
