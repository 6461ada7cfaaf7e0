// This file is part of zinc64.
// Copyright (c) 2016-2019 Sebastian Jastrzebski. All rights reserved.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

use bit_field::BitField;

use c64_core::factory::{make_noop, Addressable, Chip, Cpu};
use c64_core::util::{new_shared, IoPort, IrqLine, Pin, Rom, Shared, StateReader, StateWriter};

use crate::cpu::Cpu6510;

use super::disk::{self, Disk};
use super::drive_memory::DriveMemory;
use super::via::Via6522;

// Reference: Ruud Baltissen, http://www.baltissen.org/newhtm/1541a.htm (UE7/UF4/UE3
// clock-chain cascade and read/write shift-register logic)

/// 16 MHz base ticks between two UE7 carries, indexed by the two density bits
/// latched on VIA2 port B (0 = fastest/innermost zone, 3 = slowest/outermost).
const CARRY_PERIOD: [i32; 4] = [16, 15, 14, 13];

/// Base ticks elapsed on the 16 MHz chain per drive CPU cycle (16 MHz / 1 MHz).
const BASE_TICKS_PER_CPU_CYCLE: i32 = 16;

pub struct Vc1541 {
    cpu: Cpu6510,
    via1: Shared<Via6522>,
    via2: Shared<Via6522>,
    disk: Disk,
    spinning: bool,
    disk_inserted: bool,
    halftrack: u8,
    offset: usize,
    zone: u8,
    next_carry: i32,
    counter_uf4: u8,
    counter_ue3: u8,
    read_shiftreg: u16,
    write_shiftreg: u8,
    sync: bool,
}

impl Vc1541 {
    pub fn new(rom: Rom) -> Self {
        let via1_irq = new_shared(IrqLine::new("via1"));
        let via2_irq = new_shared(IrqLine::new("via2"));
        let via1 = new_shared(Via6522::new(0, via1_irq.clone()));
        let via2 = new_shared(Via6522::new(0, via2_irq.clone()));
        let mem: Shared<dyn Addressable> =
            new_shared(DriveMemory::new(rom, via1.clone(), via2.clone()));
        let cpu_io_port = new_shared(IoPort::new(0b_0010_1111, 0b_0001_1111));
        let ba_line = new_shared(Pin::new_high());
        let cpu = Cpu6510::new(mem, cpu_io_port, ba_line, via1_irq, via2_irq);
        Vc1541 {
            cpu,
            via1,
            via2,
            disk: Disk::new(),
            spinning: false,
            disk_inserted: false,
            halftrack: 1,
            offset: 0,
            zone: disk::zone_for_track(1),
            next_carry: CARRY_PERIOD[disk::zone_for_track(1) as usize],
            counter_uf4: 0,
            counter_ue3: 0,
            read_shiftreg: 0,
            write_shiftreg: 0,
            sync: false,
        }
    }

    pub fn insert_disk(&mut self, disk: Disk) {
        self.disk = disk;
        self.disk_inserted = true;
    }

    pub fn eject_disk(&mut self) {
        self.disk_inserted = false;
        self.disk = Disk::new();
    }

    pub fn has_disk(&self) -> bool {
        self.disk_inserted
    }

    pub fn is_rotating(&self) -> bool {
        self.spinning
    }

    pub fn set_rotating(&mut self, value: bool) {
        self.spinning = value;
    }

    pub fn get_sync(&self) -> bool {
        self.sync
    }

    pub fn get_halftrack(&self) -> u8 {
        self.halftrack
    }

    pub fn set_halftrack(&mut self, halftrack: u8) {
        self.halftrack = halftrack.max(disk::MIN_HALFTRACK).min(disk::MAX_HALFTRACK);
        self.offset = 0;
    }

    fn read_mode(&self) -> bool {
        self.via2.borrow().get_pcr().get_bit(5)
    }

    /// Reads the zone bits VIA2 port B drives onto PB5/PB6, then reprograms
    /// the carry period immediately, per the per-cycle execution contract.
    fn sample_zone(&mut self) {
        let pb = self.via2.borrow().port_b_output();
        let new_zone = (pb >> 5) & 0x03;
        if new_zone != self.zone {
            self.zone = new_zone;
        }
    }

    fn execute_ue7(&mut self) {
        self.counter_uf4 = (self.counter_uf4 + 1) & 0x0f;
        if self.counter_uf4 % 4 == 0 {
            self.execute_bit_ready();
        }
    }

    fn execute_bit_ready(&mut self) {
        if self.read_mode() {
            let bit = self.disk.read_bit(self.halftrack, self.offset);
            self.read_shiftreg = (self.read_shiftreg << 1) | bit as u16;
            self.offset = (self.offset + 1) % self.disk.length_of_halftrack(self.halftrack).max(1);
            let sync_now = (self.read_shiftreg & 0x03ff) == 0x03ff;
            if self.sync && !sync_now {
                self.counter_ue3 = 0;
            }
            self.sync = sync_now;
        } else {
            let bit = (self.write_shiftreg & 0x80 != 0) as u8;
            self.disk.write_bit(self.halftrack, self.offset, bit);
            self.write_shiftreg <<= 1;
            self.offset = (self.offset + 1) % self.disk.length_of_halftrack(self.halftrack).max(1);
        }
        self.counter_ue3 = (self.counter_ue3 + 1) & 0x07;
        if self.counter_ue3 == 0 {
            self.execute_byte_ready();
        }
    }

    fn execute_byte_ready(&mut self) {
        self.via2.borrow_mut().set_ca1(true);
        if self.read_mode() {
            let byte = (self.read_shiftreg & 0xff) as u8;
            self.via2.borrow_mut().latch_input_a(byte);
        } else {
            self.write_shiftreg = self.via2.borrow().output_a();
        }
        self.via2.borrow_mut().set_ca1(false);
    }

    /// The mounted disk's own bytes are media, not machine state — a host
    /// restoring a snapshot is expected to have already reattached the same
    /// disk via `insert_disk`. This covers the drive CPU, both VIAs, and the
    /// head/clock-chain position only.
    pub fn save_state(&self, w: &mut StateWriter) {
        w.write_u8(self.cpu.get_a());
        w.write_u8(self.cpu.get_x());
        w.write_u8(self.cpu.get_y());
        w.write_u8(self.cpu.get_p());
        w.write_u8(self.cpu.get_sp());
        w.write_u16(self.cpu.get_pc());
        self.via1.borrow().save_state(w);
        self.via2.borrow().save_state(w);
        w.write_bool(self.spinning);
        w.write_bool(self.disk_inserted);
        w.write_u8(self.halftrack);
        w.write_u32(self.offset as u32);
        w.write_u8(self.zone);
        w.write_i32(self.next_carry);
        w.write_u8(self.counter_uf4);
        w.write_u8(self.counter_ue3);
        w.write_u16(self.read_shiftreg);
        w.write_u8(self.write_shiftreg);
        w.write_bool(self.sync);
    }

    pub fn load_state(&mut self, r: &mut StateReader) {
        self.cpu.set_a(r.read_u8());
        self.cpu.set_x(r.read_u8());
        self.cpu.set_y(r.read_u8());
        self.cpu.set_p(r.read_u8());
        self.cpu.set_sp(r.read_u8());
        self.cpu.set_pc(r.read_u16());
        self.via1.borrow_mut().load_state(r);
        self.via2.borrow_mut().load_state(r);
        self.spinning = r.read_bool();
        self.disk_inserted = r.read_bool();
        self.halftrack = r.read_u8();
        self.offset = r.read_u32() as usize;
        self.zone = r.read_u8();
        self.next_carry = r.read_i32();
        self.counter_uf4 = r.read_u8();
        self.counter_ue3 = r.read_u8();
        self.read_shiftreg = r.read_u16();
        self.write_shiftreg = r.read_u8();
        self.sync = r.read_bool();
    }

    /// Advances the drive one CPU cycle: the 16 MHz chain, both VIAs, and the
    /// drive CPU, mirroring the scheduler's per-cycle ordering for the main bus.
    pub fn clock(&mut self) {
        if self.disk_inserted && self.spinning {
            self.sample_zone();
            self.next_carry -= BASE_TICKS_PER_CPU_CYCLE;
            while self.next_carry <= 0 {
                self.execute_ue7();
                self.next_carry += CARRY_PERIOD[self.zone as usize];
            }
        }
        self.via1.borrow_mut().clock();
        self.via2.borrow_mut().clock();
        self.cpu.step(&make_noop());
    }
}

impl Chip for Vc1541 {
    fn clock(&mut self) {
        Vc1541::clock(self);
    }

    fn clock_delta(&mut self, delta: u32) {
        for _ in 0..delta {
            Vc1541::clock(self);
        }
    }

    fn process_vsync(&mut self) {}

    fn reset(&mut self) {
        self.via1.borrow_mut().reset();
        self.via2.borrow_mut().reset();
        Cpu::reset(&mut self.cpu);
        self.counter_uf4 = 0;
        self.counter_ue3 = 0;
        self.read_shiftreg = 0;
        self.write_shiftreg = 0;
        self.sync = false;
        self.next_carry = CARRY_PERIOD[self.zone as usize];
    }

    fn read(&mut self, _reg: u8) -> u8 {
        0
    }

    fn write(&mut self, _reg: u8, _value: u8) {}
}
