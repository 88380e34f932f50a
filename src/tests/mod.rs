
use super::LinkerError;

fn assert_send<T: Send>() {}
fn assert_sync<T: Sync>() {}
fn assert_std_err_impl<T: ::std::error::Error>() {}

#[test]
fn assert_error_properties() {
    assert_send::<LinkerError>();
    assert_sync::<LinkerError>();
    assert_std_err_impl::<LinkerError>();
}
