//! 8253/8254 Programmable Interval Timer.

use x86_64::instructions::port::Port;

/// Input clock of the PIT in Hz.
pub const BASE_FREQUENCY: u32 = 1_193_182;

const CHANNEL0_DATA: u16 = 0x40;
const COMMAND: u16 = 0x43;

/// Channel 0, lobyte/hibyte access, mode 3 (square wave), binary.
const CHANNEL0_SQUARE_WAVE: u8 = 0b0011_0110;

/// Divisor for `hz`, or `None` if the PIT cannot produce that rate.
pub fn divisor(hz: u32) -> Option<u16> {
    if hz == 0 {
        return None;
    }
    u16::try_from(BASE_FREQUENCY / hz).ok().filter(|&d| d > 1)
}

/// Programs channel 0 to fire IRQ0 at `hz`.
pub fn set_frequency(hz: u32) -> bool {
    let Some(divisor) = divisor(hz) else {
        return false;
    };
    // SAFETY: Ports 0x40 and 0x43 belong to the PIT. Reprogramming channel 0
    // only changes the rate of IRQ0.
    unsafe {
        let mut command: Port<u8> = Port::new(COMMAND);
        let mut data: Port<u8> = Port::new(CHANNEL0_DATA);
        command.write(CHANNEL0_SQUARE_WAVE);
        data.write((divisor & 0xFF) as u8);
        data.write((divisor >> 8) as u8);
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_divisor_range() {
        assert_eq!(divisor(100), Some(11_931));
        assert_eq!(divisor(0), None);
        assert_eq!(divisor(10), None); // divisor would overflow u16
        assert_eq!(divisor(BASE_FREQUENCY), None);
    }
}
