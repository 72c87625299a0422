pub const MAX_WITHDRAWALS_PER_PAYLOAD: usize = 16;
