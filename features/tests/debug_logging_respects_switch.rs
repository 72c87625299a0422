// The `unused_crate_dependencies` lint checks every crate in a package separately.
// See <https://github.com/rust-lang/rust/issues/57274>.
#![expect(unused_crate_dependencies)]

use features::{log, Feature};
use log::Level;

#[test]
fn debug_logging_respects_switch() {
    testing_logger::setup();

    showcase();

    testing_logger::validate(|logs| {
        itertools::assert_equal(
            logs.iter().map(|log| log.body.as_str()),
            [
                "[DebugEth1] inserted deposit 7",
                "[DebugEth1] inserted deposit 7",
                "[DebugEth1] inserted deposit 7",
            ],
        );

        for log in logs {
            assert_eq!(log.level, Level::Info);
            assert_eq!(log.target, "features");
        }
    });
}

fn showcase() {
    let index = 7;

    // Nothing is logged while the switch is off.
    log!(DebugEth1, "inserted deposit {index}");

    Feature::DebugEth1.enable();

    Feature::DebugEth1.log(format_args!("inserted deposit {index}"));

    // The expressions used in the message are only evaluated if the feature is enabled.
    log!(DebugEth1, "inserted deposit {index}");

    // Using the full path may help avoid namespace clashes with `log::log!`.
    features::log!(DebugEth1, "inserted deposit {}", 3 + 4);

    Feature::DebugEth1.set_enabled(false);

    features::log!(DebugEth1, "inserted deposit {index}");
}
