use sandterm_core::{ClientMessage, Inbound, TerminalSize, decode};

fn decode_str(payload: &str) -> Inbound {
    decode(payload.as_bytes().to_vec())
}

#[test]
fn decodes_resize_envelope() {
    assert_eq!(
        decode_str(r#"{"type":"resize","cols":100,"rows":40}"#),
        Inbound::Control(ClientMessage::Resize {
            cols: 100,
            rows: 40
        })
    );
}

#[test]
fn decodes_input_envelope() {
    assert_eq!(
        decode_str(r#"{"type":"input","data":"ls\n"}"#),
        Inbound::Control(ClientMessage::Input {
            data: "ls\n".to_string()
        })
    );
}

#[test]
fn plain_keystrokes_pass_through_untouched() {
    for payload in ["ls -la\r", "q", "\u{1b}[A", "1", "null", "\"quoted\""] {
        assert_eq!(
            decode_str(payload),
            Inbound::Raw(payload.as_bytes().to_vec()),
            "payload {payload:?}"
        );
    }
}

#[test]
fn unknown_message_type_is_raw() {
    let payload = r#"{"type":"ping"}"#;
    assert_eq!(decode_str(payload), Inbound::Raw(payload.as_bytes().to_vec()));
}

#[test]
fn malformed_envelopes_are_raw() {
    for payload in [
        r#"{"type":"resize","cols":100}"#,
        r#"{"type":"resize","cols":-1,"rows":40}"#,
        r#"{"type":"resize","cols":70000,"rows":40}"#,
        r#"{"type":"input","data":42}"#,
        r#"{"type":"input""#,
        r#"[1,2,3]"#,
    ] {
        assert_eq!(
            decode_str(payload),
            Inbound::Raw(payload.as_bytes().to_vec()),
            "payload {payload:?}"
        );
    }
}

#[test]
fn non_utf8_bytes_are_raw() {
    let payload = vec![0xff, 0xfe, b'{', 0x00];
    assert_eq!(decode(payload.clone()), Inbound::Raw(payload));
}

#[test]
fn clamps_degenerate_geometry() {
    assert_eq!(
        TerminalSize::new(0, 0).clamped(),
        TerminalSize::new(1, 1)
    );
    assert_eq!(TerminalSize::default(), TerminalSize::new(80, 24));
}
