// This file is part of zinc64.
// Copyright (c) 2016-2019 Sebastian Jastrzebski. All rights reserved.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

use std::io::{self, Read, Write};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use c64_core::factory::Cpu;
use c64_core::util::{StateReader, StateWriter};

use super::Machine;

const MAGIC: u32 = 0x5a36_3453; // "Z64S"
const VERSION: u8 = 1;

/// Error produced by a failed snapshot load. The running machine is left untouched;
/// a snapshot is decoded into a scratch copy and only swapped in on full success.
#[derive(Debug)]
pub enum SnapshotError {
    BadMagic,
    UnsupportedVersion(u8),
    Io(io::Error),
}

impl From<io::Error> for SnapshotError {
    fn from(err: io::Error) -> Self {
        SnapshotError::Io(err)
    }
}

impl std::fmt::Display for SnapshotError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SnapshotError::BadMagic => write!(f, "invalid snapshot magic"),
            SnapshotError::UnsupportedVersion(v) => write!(f, "unsupported snapshot version {}", v),
            SnapshotError::Io(e) => write!(f, "snapshot io error: {}", e),
        }
    }
}

impl std::error::Error for SnapshotError {}

struct CpuState {
    a: u8,
    x: u8,
    y: u8,
    p: u8,
    sp: u8,
    pc: u16,
}

/// Writes a component's `save_state` output as a length-prefixed blob, matching
/// the framing already used for the RAM/color-RAM buffers below.
fn write_blob<W: Write>(writer: &mut W, bytes: &[u8]) -> Result<(), SnapshotError> {
    writer.write_u32::<BigEndian>(bytes.len() as u32)?;
    writer.write_all(bytes)?;
    Ok(())
}

fn read_blob<R: Read>(reader: &mut R) -> Result<Vec<u8>, SnapshotError> {
    let len = reader.read_u32::<BigEndian>()? as usize;
    let mut bytes = vec![0u8; len];
    reader.read_exact(&mut bytes)?;
    Ok(bytes)
}

impl Machine {
    /// Serializes the running state into a big-endian byte stream: a versioned header,
    /// the CPU registers, clock/frame counters, RAM/color-RAM contents, and then one
    /// length-prefixed blob per remaining component (VIC-II, SID, CIA1, CIA2, drive),
    /// in that fixed order.
    pub fn save_snapshot<W: Write>(&self, writer: &mut W) -> Result<(), SnapshotError> {
        writer.write_u32::<BigEndian>(MAGIC)?;
        writer.write_u8(VERSION)?;

        writer.write_u8(self.get_cpu().get_a())?;
        writer.write_u8(self.get_cpu().get_x())?;
        writer.write_u8(self.get_cpu().get_y())?;
        writer.write_u8(self.get_cpu().get_p())?;
        writer.write_u8(self.get_cpu().get_sp())?;
        writer.write_u16::<BigEndian>(self.get_cpu().get_pc())?;

        writer.write_u64::<BigEndian>(self.get_cycles())?;
        writer.write_u32::<BigEndian>(self.get_frame_count())?;

        let ram = self.ram.borrow();
        writer.write_u32::<BigEndian>(ram.as_bytes().len() as u32)?;
        writer.write_all(ram.as_bytes())?;
        drop(ram);

        let color_ram = self.color_ram.borrow();
        writer.write_u32::<BigEndian>(color_ram.as_bytes().len() as u32)?;
        writer.write_all(color_ram.as_bytes())?;
        drop(color_ram);

        let mut vic_state = StateWriter::new();
        self.get_vic().borrow().save_state(&mut vic_state);
        write_blob(writer, &vic_state.into_vec())?;

        let mut sid_state = StateWriter::new();
        self.get_sid().borrow().save_state(&mut sid_state);
        write_blob(writer, &sid_state.into_vec())?;

        let mut cia_1_state = StateWriter::new();
        self.get_cia_1().borrow().save_state(&mut cia_1_state);
        write_blob(writer, &cia_1_state.into_vec())?;

        let mut cia_2_state = StateWriter::new();
        self.get_cia_2().borrow().save_state(&mut cia_2_state);
        write_blob(writer, &cia_2_state.into_vec())?;

        let mut drive_state = StateWriter::new();
        self.get_drive().borrow().save_state(&mut drive_state);
        write_blob(writer, &drive_state.into_vec())?;

        Ok(())
    }

    /// Restores state previously written by `save_snapshot`. The byte stream is fully
    /// decoded into a scratch `CpuState` plus RAM and per-component buffers before
    /// anything is written into the live machine, so a truncated or malformed stream
    /// leaves this machine unmodified.
    pub fn load_snapshot<R: Read>(&mut self, reader: &mut R) -> Result<(), SnapshotError> {
        let magic = reader.read_u32::<BigEndian>()?;
        if magic != MAGIC {
            return Err(SnapshotError::BadMagic);
        }
        let version = reader.read_u8()?;
        if version != VERSION {
            return Err(SnapshotError::UnsupportedVersion(version));
        }

        let cpu_state = CpuState {
            a: reader.read_u8()?,
            x: reader.read_u8()?,
            y: reader.read_u8()?,
            p: reader.read_u8()?,
            sp: reader.read_u8()?,
            pc: reader.read_u16::<BigEndian>()?,
        };
        let cycles = reader.read_u64::<BigEndian>()?;
        let frame_count = reader.read_u32::<BigEndian>()?;

        let ram_len = reader.read_u32::<BigEndian>()? as usize;
        let mut ram_bytes = vec![0u8; ram_len];
        reader.read_exact(&mut ram_bytes)?;

        let color_ram_len = reader.read_u32::<BigEndian>()? as usize;
        let mut color_ram_bytes = vec![0u8; color_ram_len];
        reader.read_exact(&mut color_ram_bytes)?;

        let vic_bytes = read_blob(reader)?;
        let sid_bytes = read_blob(reader)?;
        let cia_1_bytes = read_blob(reader)?;
        let cia_2_bytes = read_blob(reader)?;
        let drive_bytes = read_blob(reader)?;

        {
            let mut ram = self.ram.borrow_mut();
            if ram.as_bytes().len() == ram_bytes.len() {
                ram.as_bytes_mut().copy_from_slice(&ram_bytes);
            }
        }
        {
            let mut color_ram = self.color_ram.borrow_mut();
            if color_ram.as_bytes().len() == color_ram_bytes.len() {
                color_ram.as_bytes_mut().copy_from_slice(&color_ram_bytes);
            }
        }
        self.get_vic().borrow_mut().load_state(&mut StateReader::new(&vic_bytes));
        self.get_sid().borrow_mut().load_state(&mut StateReader::new(&sid_bytes));
        self.get_cia_1().borrow_mut().load_state(&mut StateReader::new(&cia_1_bytes));
        self.get_cia_2().borrow_mut().load_state(&mut StateReader::new(&cia_2_bytes));
        self.get_drive().borrow_mut().load_state(&mut StateReader::new(&drive_bytes));

        let cpu = self.get_cpu_mut();
        cpu.set_a(cpu_state.a);
        cpu.set_x(cpu_state.x);
        cpu.set_y(cpu_state.y);
        cpu.set_p(cpu_state.p);
        cpu.set_sp(cpu_state.sp);
        cpu.set_pc(cpu_state.pc);

        self.clock.reset();
        self.clock.tick_delta(cycles);
        self.frame_count = frame_count;
        self.frame_cycle = 0;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::system::{Config, Roms};
    use c64_core::factory::SystemModel;

    fn test_machine() -> Machine {
        let roms = Roms::new(vec![0; 0x2000], vec![0; 0x1000], vec![0; 0x2000], vec![0; 0x4000]);
        let config = Config::new(SystemModel::Pal, roms);
        Machine::build(config)
    }

    #[test]
    fn round_trips_cpu_and_ram() {
        let mut machine = test_machine();
        machine.load(&[0xa9, 0x42], 0x0801);
        machine.get_cpu_mut().set_pc(0x0801);
        machine.get_cpu_mut().set_a(0x7f);

        let mut buf = Vec::new();
        machine.save_snapshot(&mut buf).unwrap();

        let mut restored = test_machine();
        restored.load_snapshot(&mut &buf[..]).unwrap();

        assert_eq!(0x0801, restored.get_cpu().get_pc());
        assert_eq!(0x7f, restored.get_cpu().get_a());
        assert_eq!(0x42, restored.get_cpu().read(0x0801));
        assert_eq!(machine.get_cycles(), restored.get_cycles());
    }

    #[test]
    fn round_trips_vic_sid_cia_and_drive_state() {
        use c64_core::factory::Chip;

        let mut machine = test_machine();
        machine.get_sid().borrow_mut().write(0x01, 0x10); // voice 0 freq hi
        machine.get_cia_1().borrow_mut().write(0x04, 0x34); // TALO latch
        machine.get_drive().borrow_mut().set_rotating(true);
        machine.get_drive().borrow_mut().set_halftrack(10);
        for _ in 0..20 {
            machine.step();
        }
        let raster_before = machine.get_vic().borrow().get_raster();

        let mut buf = Vec::new();
        machine.save_snapshot(&mut buf).unwrap();

        let mut restored = test_machine();
        restored.load_snapshot(&mut &buf[..]).unwrap();

        assert_eq!(raster_before, restored.get_vic().borrow().get_raster());
        assert!(restored.get_drive().borrow().is_rotating());
        assert_eq!(10, restored.get_drive().borrow().get_halftrack());
        assert_eq!(
            machine.get_sid().borrow_mut().read(0x1b),
            restored.get_sid().borrow_mut().read(0x1b)
        );
    }

    #[test]
    fn rejects_bad_magic() {
        let mut machine = test_machine();
        let bytes = [0u8; 4];
        let result = machine.load_snapshot(&mut &bytes[..]);
        assert!(matches!(result, Err(SnapshotError::BadMagic)));
    }
}
