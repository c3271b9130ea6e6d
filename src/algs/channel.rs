//! Named field buffers exchanged with the partner code.
//!
//! A [`FieldChannel`] carries whole field buffers between this process and
//! its peer in the other code. Fields are registered once by name; each
//! gets its own message tag. Transfers are either synchronous (complete
//! before the call returns, only outside a phase) or deferred (posted inside
//! a begin/end phase and completed when the phase ends).

use hashbrown::HashMap;

use crate::algs::communicator::{Communicator, Wait};
use crate::algs::wire::{self, WireSample, kind};
use crate::coupler_error::CouplerError;

/// How a single transfer completes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Mode {
    Synchronous,
    Deferred,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    Idle,
    Sending,
    Receiving,
}

#[derive(Clone, Debug)]
struct FieldEntry {
    tag: u16,
    len: usize,
}

pub struct FieldChannel<C: Communicator> {
    comm: C,
    peer: usize,
    base_tag: u16,
    fields: HashMap<String, FieldEntry>,
    phase: Phase,
    sends: Vec<C::SendHandle>,
    recvs: Vec<(String, C::RecvHandle)>,
    arrived: HashMap<String, Vec<u8>>,
}

impl<C: Communicator> FieldChannel<C> {
    /// Channel to `peer`; field tags start at `base_tag`.
    pub fn new(comm: C, peer: usize, base_tag: u16) -> Self {
        Self {
            comm,
            peer,
            base_tag,
            fields: HashMap::new(),
            phase: Phase::Idle,
            sends: Vec::new(),
            recvs: Vec::new(),
            arrived: HashMap::new(),
        }
    }

    pub fn comm(&self) -> &C {
        &self.comm
    }

    /// Register a field of `len` samples. Both sides must register the same
    /// fields in the same order.
    pub fn register(&mut self, name: &str, len: usize) -> Result<(), CouplerError> {
        if self.fields.contains_key(name) {
            return Err(CouplerError::DuplicateField(name.to_owned()));
        }
        let tag = self.base_tag + self.fields.len() as u16;
        self.fields.insert(name.to_owned(), FieldEntry { tag, len });
        Ok(())
    }

    pub fn begin_send_phase(&mut self) -> Result<(), CouplerError> {
        self.enter(Phase::Sending, "send phase begun while another phase is open")
    }

    /// Complete every deferred send of the phase.
    pub fn end_send_phase(&mut self) -> Result<(), CouplerError> {
        if self.phase != Phase::Sending {
            return Err(CouplerError::PhaseViolation("no send phase to end"));
        }
        for h in self.sends.drain(..) {
            h.wait();
        }
        self.phase = Phase::Idle;
        Ok(())
    }

    pub fn begin_receive_phase(&mut self) -> Result<(), CouplerError> {
        self.enter(Phase::Receiving, "receive phase begun while another phase is open")
    }

    /// Complete every deferred receive of the phase. Their data is then
    /// available through [`read_field`](Self::read_field).
    pub fn end_receive_phase(&mut self) -> Result<(), CouplerError> {
        if self.phase != Phase::Receiving {
            return Err(CouplerError::PhaseViolation("no receive phase to end"));
        }
        self.phase = Phase::Idle;
        for (name, h) in self.recvs.drain(..) {
            let raw = h.wait().ok_or_else(|| {
                CouplerError::Transport(format!("field `{name}` never arrived"))
            })?;
            self.arrived.insert(name, raw);
        }
        Ok(())
    }

    /// Send `data` as field `name`.
    pub fn send_field<T: WireSample>(
        &mut self,
        name: &str,
        data: &[T],
        mode: Mode,
    ) -> Result<(), CouplerError> {
        self.check_mode(mode, Phase::Sending)?;
        let entry = self.entry(name)?;
        CouplerError::expect_len("sent field", entry.len, data.len())?;
        let msg = wire::encode(kind::FIELD, data);
        let h = self.comm.isend(self.peer, entry.tag, &msg);
        match mode {
            Mode::Synchronous => {
                h.wait();
            }
            Mode::Deferred => self.sends.push(h),
        }
        log::debug!("sent field `{name}` ({} samples, {mode:?})", data.len());
        Ok(())
    }

    /// Receive field `name`. A synchronous receive fills `out` immediately;
    /// a deferred one only posts the receive and leaves `out` untouched.
    pub fn receive_field<T: WireSample>(
        &mut self,
        name: &str,
        out: &mut [T],
        mode: Mode,
    ) -> Result<(), CouplerError> {
        self.check_mode(mode, Phase::Receiving)?;
        let entry = self.entry(name)?;
        CouplerError::expect_len("received field", entry.len, out.len())?;
        let mut buf = vec![0u8; wire::message_len::<T>(entry.len)];
        let h = self.comm.irecv(self.peer, entry.tag, &mut buf);
        match mode {
            Mode::Synchronous => {
                let raw = h.wait().ok_or_else(|| {
                    CouplerError::Transport(format!("field `{name}` never arrived"))
                })?;
                wire::decode_into(kind::FIELD, &raw, out)
            }
            Mode::Deferred => {
                self.recvs.push((name.to_owned(), h));
                Ok(())
            }
        }
    }

    /// Decode a field completed by the last receive phase into `out`.
    pub fn read_field<T: WireSample>(&mut self, name: &str, out: &mut [T]) -> Result<(), CouplerError> {
        if self.phase != Phase::Idle {
            return Err(CouplerError::PhaseViolation("field read before its receive phase ended"));
        }
        let raw = self
            .arrived
            .remove(name)
            .ok_or_else(|| CouplerError::UnknownField(name.to_owned()))?;
        wire::decode_into(kind::FIELD, &raw, out)
    }

    fn enter(&mut self, phase: Phase, msg: &'static str) -> Result<(), CouplerError> {
        if self.phase != Phase::Idle {
            return Err(CouplerError::PhaseViolation(msg));
        }
        self.phase = phase;
        Ok(())
    }

    fn check_mode(&self, mode: Mode, phase: Phase) -> Result<(), CouplerError> {
        match (mode, self.phase == phase) {
            (Mode::Deferred, false) => Err(CouplerError::PhaseViolation(
                "deferred transfer outside its phase",
            )),
            (Mode::Synchronous, _) if self.phase != Phase::Idle => Err(
                CouplerError::PhaseViolation("synchronous transfer inside a phase"),
            ),
            _ => Ok(()),
        }
    }

    fn entry(&self, name: &str) -> Result<FieldEntry, CouplerError> {
        self.fields
            .get(name)
            .cloned()
            .ok_or_else(|| CouplerError::UnknownField(name.to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algs::communicator::LocalComm;

    fn pair() -> (FieldChannel<LocalComm>, FieldChannel<LocalComm>) {
        let mut comms = LocalComm::group(2);
        let b = comms.pop().unwrap();
        let a = comms.pop().unwrap();
        let mut ca = FieldChannel::new(a, 1, 100);
        let mut cb = FieldChannel::new(b, 0, 100);
        for c in [&mut ca, &mut cb] {
            c.register("density", 3).unwrap();
            c.register("potential", 2).unwrap();
        }
        (ca, cb)
    }

    #[test]
    fn duplicate_registration_fails() {
        let (mut a, _) = pair();
        assert_eq!(
            a.register("density", 3),
            Err(CouplerError::DuplicateField("density".into()))
        );
    }

    #[test]
    fn deferred_requires_phase() {
        let (mut a, _) = pair();
        assert!(matches!(
            a.send_field("density", &[1.0f64, 2.0, 3.0], Mode::Deferred),
            Err(CouplerError::PhaseViolation(_))
        ));
        a.begin_send_phase().unwrap();
        assert!(matches!(
            a.send_field("density", &[1.0f64, 2.0, 3.0], Mode::Synchronous),
            Err(CouplerError::PhaseViolation(_))
        ));
        assert!(a.begin_receive_phase().is_err());
    }

    #[test]
    fn deferred_round_trip() {
        let (mut a, mut b) = pair();
        a.begin_send_phase().unwrap();
        a.send_field("potential", &[4.0f64, 5.0], Mode::Deferred).unwrap();
        a.send_field("density", &[1.0f64, 2.0, 3.0], Mode::Deferred).unwrap();
        a.end_send_phase().unwrap();

        b.begin_receive_phase().unwrap();
        let mut d = [0.0f64; 3];
        let mut p = [0.0f64; 2];
        b.receive_field("density", &mut d, Mode::Deferred).unwrap();
        b.receive_field("potential", &mut p, Mode::Deferred).unwrap();
        assert!(b.read_field("density", &mut d).is_err());
        b.end_receive_phase().unwrap();
        b.read_field("density", &mut d).unwrap();
        b.read_field("potential", &mut p).unwrap();
        assert_eq!(d, [1.0, 2.0, 3.0]);
        assert_eq!(p, [4.0, 5.0]);
    }

    #[test]
    fn synchronous_round_trip_and_unknown_field() {
        let (mut a, mut b) = pair();
        a.send_field("potential", &[7.0f64, 8.0], Mode::Synchronous)
            .unwrap();
        let mut p = [0.0f64; 2];
        b.receive_field("potential", &mut p, Mode::Synchronous).unwrap();
        assert_eq!(p, [7.0, 8.0]);
        assert_eq!(
            b.receive_field("temperature", &mut p, Mode::Synchronous),
            Err(CouplerError::UnknownField("temperature".into()))
        );
    }
}
