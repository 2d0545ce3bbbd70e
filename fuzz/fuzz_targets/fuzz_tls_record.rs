#![no_main]
use libfuzzer_sys::fuzz_target;
use tlsrec_record::{
    read_record, CipherSuite, CipherSuiteParams, ConnectionCipherState, ConnectionSide,
    NoCipherState, ProtocolVersion, RecordConfig, SequenceNumbers, SessionKeys, Transport,
};

fuzz_target!(|data: &[u8]| {
    let config = RecordConfig::default();

    // plaintext, split at a data-dependent point
    let mut buf = Vec::new();
    let split = data.first().map_or(0, |&b| usize::from(b)).min(data.len());
    let mut seq = SequenceNumbers::stream(&config);
    for chunk in [&data[..split], &data[split..]] {
        let mut rest = chunk;
        while !rest.is_empty() {
            match read_record(&mut buf, rest, Transport::Stream, Some(&mut seq), &mut NoCipherState) {
                Ok(outcome) => rest = &rest[outcome.consumed..],
                Err(_) => return,
            }
        }
    }

    // the same bytes under a CBC cipher state
    let version = ProtocolVersion::TLS_V10;
    let Ok(params) = CipherSuiteParams::from_suite(CipherSuite::TLS_RSA_WITH_AES_128_CBC_SHA) else {
        return;
    };
    let block = vec![0x24u8; params.key_block_len()];
    let Ok(keys) = SessionKeys::from_key_block(&params, &block) else {
        return;
    };
    let Ok(mut state) = ConnectionCipherState::new(version, ConnectionSide::Client, &params, &keys)
    else {
        return;
    };
    let mut lookup = Some(&mut state);
    let mut buf = Vec::new();
    let _ = read_record(&mut buf, data, Transport::Stream, None, &mut lookup);

    // and as datagrams with replay tracking
    let mut seq = SequenceNumbers::datagram(&config);
    let mut buf = Vec::new();
    let mut rest = data;
    while !rest.is_empty() {
        match read_record(&mut buf, rest, Transport::Datagram, Some(&mut seq), &mut NoCipherState) {
            Ok(outcome) => rest = &rest[outcome.consumed..],
            Err(_) => return,
        }
    }
});
