// This file is part of zinc64.
// Copyright (c) 2016-2019 Sebastian Jastrzebski. All rights reserved.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

use std::rc::Rc;

use c64_core::factory::{Addressable, AddressableFaded, Chip, Cpu, Mmu, TickFn};
use c64_core::io::cia::Mode as CiaMode;
use c64_core::io::Cia;
use c64_core::util::{new_shared, Clock, IoPort, IrqLine, Pin, Ram, Rom, Shared};

use crate::cpu::Cpu6510;
use crate::device::Cartridge;
use crate::drive::Vc1541;
use crate::mem::{ExpansionPort, Memory, Mmio, Pla};
use crate::sound::Sid;
use crate::video::{RenderTarget, Vic, VicMemory};

use super::Config;

// Design:
//   Machine owns every component and all I/O lines connecting them; it is the single
//   top-level arena resolving the cyclic CPU/VIC/CIA/expansion-port dependencies.

#[allow(dead_code)]
#[derive(Copy, Clone)]
enum BaseAddr {
    Basic = 0xa000,
    Kernal = 0xe000,
}

impl BaseAddr {
    pub fn addr(self) -> u16 {
        self as u16
    }
}

pub struct Machine {
    config: Config,
    // Chipset
    cpu: Cpu6510,
    cia_1: Shared<Cia>,
    cia_2: Shared<Cia>,
    sid: Shared<Sid>,
    vic: Shared<Vic>,
    drive: Shared<Vc1541>,
    // Memory
    pub(super) color_ram: Shared<Ram>,
    expansion_port: Shared<ExpansionPort>,
    pub(super) ram: Shared<Ram>,
    keyboard_matrix: Shared<[u8; 16]>,
    // Buffers
    frame_buffer: Shared<RenderTarget>,
    // Runtime state
    pub(super) clock: Rc<Clock>,
    pub(super) frame_cycle: u32,
    pub(super) frame_count: u32,
    last_pc: u16,
    suspend_depth: u32,
    tick_fn: TickFn,
}

impl Machine {
    pub fn build(config: Config) -> Machine {
        info!(target: "machine", "Initializing system");
        let clock = Rc::new(Clock::default());
        let keyboard_matrix = new_shared([0xffu8; 16]);

        // I/O lines
        let ba_line = new_shared(Pin::new_high());
        let cpu_io_port = new_shared(IoPort::new(0x00, 0xff));
        let cia_1_flag_pin = new_shared(Pin::new_low());
        let cia_1_port_a = new_shared(IoPort::new(0x00, 0xff));
        let cia_1_port_b = new_shared(IoPort::new(0x00, 0xff));
        let cia_2_flag_pin = new_shared(Pin::new_low());
        let cia_2_port_a = new_shared(IoPort::new(0x00, 0xff));
        let cia_2_port_b = new_shared(IoPort::new(0x00, 0xff));
        let exp_io_line = new_shared(IoPort::new(0xff, 0xff));
        let irq_line = new_shared(IrqLine::new("irq"));
        let nmi_line = new_shared(IrqLine::new("nmi"));

        // Memory
        let color_ram = new_shared(Ram::new(config.model.color_ram()));
        let ram = new_shared(Ram::new(config.model.memory_size()));
        let rom_basic = new_shared(Rom::new_with_data(
            &config.roms.basic,
            BaseAddr::Basic.addr(),
        ));
        let rom_charset = new_shared(Rom::new_with_data(&config.roms.charset, 0));
        let rom_kernal = new_shared(Rom::new_with_data(
            &config.roms.kernal,
            BaseAddr::Kernal.addr(),
        ));

        // Chipset
        let cia_1 = new_shared(Cia::new(
            CiaMode::Cia1,
            None,
            None,
            Some(keyboard_matrix.clone()),
            cia_1_port_a.clone(),
            cia_1_port_b.clone(),
            cia_1_flag_pin.clone(),
            irq_line.clone(),
        ));
        let cia_2 = new_shared(Cia::new(
            CiaMode::Cia2,
            None,
            None,
            None,
            cia_2_port_a.clone(),
            cia_2_port_b.clone(),
            cia_2_flag_pin.clone(),
            nmi_line.clone(),
        ));
        let sid = new_shared(Sid::new(
            config.model.sid_model(),
            config.model.cpu_freq(),
            config.sample_rate,
        ));
        let frame_buffer = new_shared(RenderTarget::new(config.screen_size()));
        let vic_ram: Shared<dyn Addressable> = ram.clone();
        let vic_charset: Shared<dyn Addressable> = rom_charset.clone();
        let vic_mem = new_shared(VicMemory::new(vic_charset, vic_ram));
        let vic = new_shared(Vic::new(
            config.model.vic_model(),
            vic_mem.clone(),
            frame_buffer.clone(),
            ba_line.clone(),
            irq_line.clone(),
        ));
        let drive = new_shared(Vc1541::new(Rom::new_with_data(&config.roms.drive, 0xc000)));

        // Memory controller and processor
        let expansion_port = new_shared(ExpansionPort::new(exp_io_line.clone()));
        let mmu: Shared<dyn Mmu> = new_shared(Pla::new());
        let expansion_port_faded: Shared<dyn AddressableFaded> = expansion_port.clone();
        let io = Mmio::new(
            cia_1.clone() as Shared<dyn Chip>,
            cia_2.clone() as Shared<dyn Chip>,
            color_ram.clone(),
            expansion_port_faded.clone(),
            sid.clone() as Shared<dyn Chip>,
            vic.clone() as Shared<dyn Chip>,
        );
        let mem = new_shared(Memory::new(
            mmu.clone(),
            expansion_port_faded,
            io,
            ram.clone(),
            rom_basic,
            rom_charset,
            rom_kernal,
        ));
        let cpu_mem: Shared<dyn Addressable> = mem;
        let cpu = Cpu6510::new(
            cpu_mem,
            cpu_io_port.clone(),
            ba_line,
            irq_line.clone(),
            nmi_line,
        );

        // Observers: processor port + expansion I/O line jointly select the PLA mode;
        // CIA2 port A (inverted, bits 0-1) selects the VIC-II bank.
        let exp_io_line_clone = exp_io_line.clone();
        let mmu_clone = mmu.clone();
        cpu_io_port.borrow_mut().set_observer(Box::new(move |cpu_port| {
            let expansion_port_io = exp_io_line_clone.borrow().get_value();
            let mode = cpu_port & 0x07 | expansion_port_io & 0x18;
            mmu_clone.borrow_mut().switch_banks(mode);
        }));
        let cpu_io_port_clone = cpu_io_port.clone();
        let mmu_clone_2 = mmu;
        exp_io_line
            .borrow_mut()
            .set_observer(Box::new(move |expansion_port_io| {
                let cpu_port_io = cpu_io_port_clone.borrow().get_value();
                let mode = cpu_port_io & 0x07 | expansion_port_io & 0x18;
                mmu_clone_2.borrow_mut().switch_banks(mode);
            }));
        let vic_mem_clone = vic_mem;
        cia_2_port_a
            .borrow_mut()
            .set_observer(Box::new(move |value| {
                vic_mem_clone.borrow_mut().set_cia_port_a(value);
            }));

        let tick_fn: TickFn = {
            let cia_1_clone = cia_1.clone();
            let cia_2_clone = cia_2.clone();
            let clock_clone = clock.clone();
            let drive_clone = drive.clone();
            let sid_clone = sid.clone();
            let vic_clone = vic.clone();
            Rc::new(move || {
                vic_clone.borrow_mut().clock();
                cia_1_clone.borrow_mut().clock();
                cia_2_clone.borrow_mut().clock();
                drive_clone.borrow_mut().clock();
                sid_clone.borrow_mut().clock();
                clock_clone.tick();
            })
        };

        Machine {
            config,
            cpu,
            cia_1,
            cia_2,
            sid,
            vic,
            drive,
            color_ram,
            expansion_port,
            ram,
            keyboard_matrix,
            frame_buffer,
            clock,
            frame_cycle: 0,
            frame_count: 0,
            last_pc: 0,
            suspend_depth: 0,
            tick_fn,
        }
    }

    // -- Accessors

    pub fn get_config(&self) -> &Config {
        &self.config
    }

    pub fn get_clock(&self) -> Rc<Clock> {
        self.clock.clone()
    }

    pub fn get_cycles(&self) -> u64 {
        self.clock.get()
    }

    pub fn get_cpu(&self) -> &dyn Cpu {
        &self.cpu
    }

    pub fn get_cpu_mut(&mut self) -> &mut dyn Cpu {
        &mut self.cpu
    }

    pub fn get_frame_buffer(&self) -> Shared<RenderTarget> {
        self.frame_buffer.clone()
    }

    pub fn get_frame_count(&self) -> u32 {
        self.frame_count
    }

    pub fn get_sid(&self) -> Shared<Sid> {
        self.sid.clone()
    }

    pub(super) fn get_cia_1(&self) -> Shared<Cia> {
        self.cia_1.clone()
    }

    pub(super) fn get_cia_2(&self) -> Shared<Cia> {
        self.cia_2.clone()
    }

    pub fn get_vic(&self) -> Shared<Vic> {
        self.vic.clone()
    }

    pub fn get_drive(&self) -> Shared<Vc1541> {
        self.drive.clone()
    }

    pub fn is_cpu_jam(&self) -> bool {
        self.last_pc == self.cpu.get_pc()
    }

    // -- Keyboard

    pub fn set_key(&mut self, row: usize, col: usize, pressed: bool) {
        use bit_field::BitField;
        let mut matrix = self.keyboard_matrix.borrow_mut();
        matrix[row].set_bit(col, !pressed);
    }

    // -- Peripherals

    pub fn attach_cartridge(&mut self, cartridge: Cartridge) {
        self.expansion_port.borrow_mut().attach(cartridge);
    }

    pub fn detach_cartridge(&mut self) {
        self.expansion_port.borrow_mut().detach();
        self.reset(false);
    }

    pub fn attach_disk(&mut self, disk: crate::drive::Disk) {
        self.drive.borrow_mut().insert_disk(disk);
    }

    pub fn detach_disk(&mut self) {
        self.drive.borrow_mut().eject_disk();
    }

    // -- Runtime

    pub fn load(&mut self, data: &[u8], offset: u16) {
        let mut mem = self.ram.borrow_mut();
        let mut address = offset;
        for byte in data {
            mem.write(address, *byte);
            address = address.wrapping_add(1);
        }
    }

    pub fn reset(&mut self, hard: bool) {
        info!(target: "machine", "Resetting system");
        self.clock.reset();
        if hard {
            for i in 0..self.config.model.memory_size() as u16 {
                self.ram.borrow_mut().write(i, 0x00);
            }
            for i in 0..self.config.model.color_ram() as u16 {
                self.color_ram.borrow_mut().write(i, 0x00);
            }
        }
        self.cpu.reset();
        self.cia_1.borrow_mut().reset();
        self.cia_2.borrow_mut().reset();
        self.sid.borrow_mut().reset();
        self.vic.borrow_mut().reset();
        self.drive.borrow_mut().reset();
        self.expansion_port.borrow_mut().reset();
        self.frame_cycle = 0;
        self.frame_count = 0;
        self.last_pc = 0;
        self.frame_buffer.borrow_mut().set_sync(false);
    }

    /// Clears the flag a host sets by reading a completed frame via `run_frame`.
    pub fn reset_vsync(&mut self) {
        self.frame_buffer.borrow_mut().set_sync(false);
    }

    /// Suspends the run loop. Nested: the core only runs again once every matching
    /// `resume()` has been issued.
    pub fn suspend(&mut self) {
        self.suspend_depth += 1;
    }

    pub fn resume(&mut self) {
        if self.suspend_depth > 0 {
            self.suspend_depth -= 1;
        }
    }

    pub fn is_suspended(&self) -> bool {
        self.suspend_depth > 0
    }

    /// Decodes and executes one CPU instruction, clocking every other component for
    /// each elapsed cycle via the shared tick callback.
    pub fn step(&mut self) {
        let tick_fn = self.tick_fn.clone();
        let before = self.clock.get();
        self.last_pc = self.cpu.get_pc();
        self.cpu.step(&tick_fn);
        let elapsed = self.clock.get().wrapping_sub(before) as u32;
        self.frame_cycle += elapsed;
        let cycles_per_frame = self.config.model.cycles_per_frame();
        if self.frame_cycle >= cycles_per_frame {
            self.frame_cycle -= cycles_per_frame;
            self.vic.borrow_mut().process_vsync();
            self.sid.borrow_mut().process_vsync();
            self.cia_1.borrow_mut().process_vsync();
            self.cia_2.borrow_mut().process_vsync();
            self.frame_count = self.frame_count.wrapping_add(1);
        }
    }

    /// Runs until the current frame completes, honoring `suspend()`.
    pub fn run_frame(&mut self) {
        self.reset_vsync();
        while !self.frame_buffer.borrow().get_sync() {
            if self.is_suspended() {
                return;
            }
            self.step();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use c64_core::factory::SystemModel;

    fn test_roms() -> super::super::Roms {
        super::super::Roms::new(vec![0; 0x2000], vec![0; 0x1000], vec![0; 0x2000], vec![0; 0x4000])
    }

    #[test]
    fn build_and_reset() {
        let config = Config::new(SystemModel::Pal, test_roms());
        let mut machine = Machine::build(config);
        machine.reset(true);
        assert_eq!(0, machine.get_cycles());
        assert_eq!(0, machine.get_frame_count());
    }

    #[test]
    fn suspend_resume_is_nested() {
        let config = Config::new(SystemModel::Pal, test_roms());
        let mut machine = Machine::build(config);
        machine.reset(true);
        machine.suspend();
        machine.suspend();
        assert!(machine.is_suspended());
        machine.resume();
        assert!(machine.is_suspended());
        machine.resume();
        assert!(!machine.is_suspended());
    }

    #[test]
    fn load_writes_ram() {
        let config = Config::new(SystemModel::Pal, test_roms());
        let mut machine = Machine::build(config);
        machine.reset(true);
        machine.load(&[0xa9, 0x01], 0x0801);
        assert_eq!(0xa9, machine.ram.borrow().read(0x0801));
    }
}
