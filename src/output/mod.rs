mod response;

pub use response::{exit_code_for_envelope, map_cmd_result_to_envelope, print_envelope};
