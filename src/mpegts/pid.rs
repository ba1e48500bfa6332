/// Packet Identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Pid(u16);

impl Pid {
    /// Maximum PID value.
    pub const MAX: u16 = (1 << 13) - 1;

    /// PID of the Program Association Table (PAT) packet.
    pub const PAT: Pid = Pid(0x0000);

    /// PID of the Conditional Access Table (CAT) packet.
    pub const CAT: Pid = Pid(0x0001);

    /// PID of the TS Description Table (TSDT) packet.
    pub const TSDT: Pid = Pid(0x0002);

    /// PID of the Network Information Table (NIT) packet.
    pub const NIT: Pid = Pid(0x0010);

    /// PID of the Service Description Table (SDT) packet.
    pub const SDT: Pid = Pid(0x0011);

    /// PID of the Event Information Table (EIT) packet.
    pub const EIT: Pid = Pid(0x0012);

    /// PID of the Time and Date Table (TDT/TOT) packet.
    pub const TDT: Pid = Pid(0x0014);

    /// PID of the null packet.
    pub const NULL: Pid = Pid(0x1FFF);

    /// Makes a new `Pid` instance, masked to 13 bits.
    pub const fn new(pid: u16) -> Self {
        Pid(pid & Self::MAX)
    }

    /// Returns the value of the `Pid`.
    pub const fn as_u16(&self) -> u16 {
        self.0
    }

    /// Null packets carry no data and are exempt from continuity tracking.
    pub const fn is_null(&self) -> bool {
        self.0 == Self::NULL.0
    }
}

impl From<u8> for Pid {
    fn from(f: u8) -> Self {
        Pid(u16::from(f))
    }
}

impl Default for Pid {
    /// Defaults to the null PID, which never carries data.
    fn default() -> Self {
        Pid::NULL
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn default_is_the_null_pid() {
        assert_eq!(Pid::default(), Pid::NULL);
        assert!(Pid::default().is_null());
    }

    #[test]
    fn values_are_masked_to_13_bits() {
        assert_eq!(Pid::new(0xFFFF), Pid::new(Pid::MAX));
        assert_eq!(Pid::new(0x2100).as_u16(), 0x0100);
    }
}
