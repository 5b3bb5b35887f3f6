//! APPLICATION tag numbers of the protocol operations.

pub const BIND_REQUEST: u32 = 0;
pub const BIND_RESPONSE: u32 = 1;
pub const UNBIND_REQUEST: u32 = 2;
pub const SEARCH_REQUEST: u32 = 3;
pub const SEARCH_RESULT_ENTRY: u32 = 4;
pub const SEARCH_RESULT_DONE: u32 = 5;
pub const MODIFY_REQUEST: u32 = 6;
pub const MODIFY_RESPONSE: u32 = 7;
pub const ADD_REQUEST: u32 = 8;
pub const ADD_RESPONSE: u32 = 9;
pub const DEL_REQUEST: u32 = 10;
pub const DEL_RESPONSE: u32 = 11;
pub const MODIFY_DN_REQUEST: u32 = 12;
pub const MODIFY_DN_RESPONSE: u32 = 13;
pub const COMPARE_REQUEST: u32 = 14;
pub const COMPARE_RESPONSE: u32 = 15;
pub const ABANDON_REQUEST: u32 = 16;
pub const SEARCH_RESULT_REFERENCE: u32 = 19;
pub const EXTENDED_REQUEST: u32 = 23;
pub const EXTENDED_RESPONSE: u32 = 24;
pub const INTERMEDIATE_RESPONSE: u32 = 25;
