pub const AWG_SAMPLE_RATE:f64 = 625E6;
pub const AWG_MIN_SEGMENT_SAMPLE:usize = 96; // for 4 channels
pub const AWG_SEGMENT_SIZE_MULTIPLE:usize = 32; // for 4 channels
pub const AWG_BOARD_COUNT:usize = 2;
pub const AWG_CHANNELS_PER_BOARD:usize = 4;
pub const TTL_CHANNELS_PER_BOARD:usize = 3;
pub const AWG_MAX_DAC:i16 = 32767;
pub const MAX_STEP_LOOPS:u64 = 1_048_575; // 20 bit loop counter
pub const BOOKEND_DURATION:f64 = 1E-6;
pub const FILLER_DURATION:f64 = 1E-3;
pub const START_SEGMENT_NAME:&str = "__start";
pub const END_SEGMENT_NAME:&str = "__end";
pub const FILLER_SEGMENT_NAME:&str = "__filler_1ms";

/// number of samples a segment of this duration occupies in awg memory
pub fn segment_samples(duration:f64,sample_rate:f64) -> usize {
    let n = (duration*sample_rate) as usize;
    let n = (n + AWG_SEGMENT_SIZE_MULTIPLE - 1)/AWG_SEGMENT_SIZE_MULTIPLE*AWG_SEGMENT_SIZE_MULTIPLE;
    n.max(AWG_MIN_SEGMENT_SAMPLE)
}
