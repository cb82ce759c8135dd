//! Walk a full EMV transaction against the scripted card emulator
//!
//! Run with `RUST_LOG=trace` to watch the raw APDU exchanges.

use hex_literal::hex;
use tracing_subscriber::EnvFilter;

use chipflow_emv::emulator::{CardEmulator, EmulatedApplication};
use chipflow_emv::{Atr, EmvSession, SmartCard, constants};

fn scripted_card() -> CardEmulator {
    let atr = Atr::new(hex!("3B 68 00 00 00 73 C8 40 12 00 90 00").to_vec()).unwrap();

    let ppse_fci = hex!(
        "6F 2C 84 0E 32 50 41 59 2E 53 59 53 2E 44 44 46 30 31"
        "A5 1A BF 0C 17 61 15"
        "4F 07 A0 00 00 00 03 10 10"
        "50 07 56 49 53 41 43 52 45"
        "87 01 01"
    );
    let visa_fci = hex!(
        "6F 27 84 07 A0 00 00 00 03 10 10"
        "A5 1C 50 0B 56 49 53 41 20 43 52 45 44 49 54"
        "87 01 01"
        "9F 38 09 9F 66 04 9F 02 06 9F 37 04"
    );
    let gpo = hex!("77 0A 82 02 39 00 94 04 08 01 02 00");
    let record_1 = hex!("70 0A 5A 08 41 11 11 11 11 11 11 11");
    let record_2 = hex!(
        "70 17 8C 15"
        "9F 02 06 9F 03 06 9F 1A 02 95 05 5F 2A 02 9A 03 9C 01 9F 37 04"
    );
    let cryptogram = hex!(
        "77 14 9F 27 01 80 9F 36 02 00 01"
        "9F 26 08 AA BB CC DD EE FF 00 11"
    );

    CardEmulator::new(atr)
        .with_application(
            EmulatedApplication::new(constants::PPSE_NAME.to_vec()).with_fci(ppse_fci.to_vec()),
        )
        .with_application(
            EmulatedApplication::new(hex!("A0000000031010").to_vec())
                .with_fci(visa_fci.to_vec())
                .with_processing_options(gpo.to_vec())
                .with_record(1, 1, record_1.to_vec())
                .with_record(1, 2, record_2.to_vec())
                .with_cryptogram(cryptogram.to_vec()),
        )
        .with_data_object(constants::tags::PIN_TRY_COUNTER, vec![0x03])
        .with_pin("1234")
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let card = scripted_card();
    println!("card ATR: {}", card.atr());

    let mut session = EmvSession::start_session(Some(SmartCard::new(card.atr().clone())), Some(card))?;

    session.init_context()?;
    println!("discovered applications:");
    for app in session.card().applications() {
        println!(
            "  {} (label {:?}, priority {:?})",
            app.aid(),
            app.label(),
            app.priority()
        );
    }

    let candidate = session.card().applications()[0].clone();
    session.select_application(candidate)?;

    session.initiate_application_processing()?;
    session.read_application_data()?;

    let app = session.card().selected_application().unwrap();
    println!(
        "selected {}: CDA supported: {}, {} records",
        app.aid(),
        app.interchange_profile().unwrap().cda_supported(),
        app.records().len()
    );

    session.prepare_transaction_processing()?;
    session.perform_transaction()?;

    let app = session.card().selected_application().unwrap();
    println!(
        "transaction complete, cryptogram template: {}",
        hex::encode(app.cryptogram().unwrap())
    );
    Ok(())
}
