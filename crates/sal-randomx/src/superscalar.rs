//! SuperscalarHash: generation and interpretation of the straight-line
//! programs that mix cache lines into dataset items.
//!
//! Program generation simulates a 3-port superscalar CPU fetching 16
//! bytes of x86 macro-ops per cycle, exactly as the reference
//! `superscalar.cpp` does: decode-buffer selection, per-slot instruction
//! choice, register allocation with group rules, and optimistic port
//! scheduling (P5 before P0 before P1). The simulation runs until the
//! target latency saturates.

use crate::blake2_gen::Blake2Generator;
use crate::config::{SUPERSCALAR_LATENCY, SUPERSCALAR_MAX_SIZE};

const CYCLE_MAP_SIZE: usize = SUPERSCALAR_LATENCY + 4;
const LOOK_FORWARD_CYCLES: usize = 4;
const MAX_THROWAWAY_COUNT: usize = 256;
/// r5 needs a SIB displacement and cannot be an IADD_RS destination.
const REGISTER_NEEDS_DISPLACEMENT: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SsOp {
    ISubR,
    IXorR,
    IAddRs,
    IMulR,
    IRorC,
    IAddC7,
    IXorC7,
    IAddC8,
    IXorC8,
    IAddC9,
    IXorC9,
    IMulhR,
    ISmulhR,
    IMulRcp,
}

impl SsOp {
    fn is_multiplication(self) -> bool {
        matches!(self, SsOp::IMulR | SsOp::IMulhR | SsOp::ISmulhR | SsOp::IMulRcp)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SsInstruction {
    pub op: SsOp,
    pub dst: usize,
    pub src: usize,
    /// IADD_RS shift selector.
    pub mod_byte: u8,
    pub imm32: u32,
    /// Precomputed 2^x/imm32 for IMUL_RCP.
    pub reciprocal: u64,
}

#[derive(Debug, Clone)]
pub struct SuperscalarProgram {
    pub instructions: Vec<SsInstruction>,
    pub address_register: usize,
}

// ─── Reciprocal ─────────────────────────────────────────────────────────

/// `2^x / divisor` for the largest x keeping the result below 2^64.
pub fn reciprocal(divisor: u32) -> u64 {
    debug_assert!(divisor != 0 && !divisor.is_power_of_two());
    let divisor = divisor as u64;
    let p2exp63 = 1u64 << 63;
    let mut quotient = p2exp63 / divisor;
    let mut remainder = p2exp63 % divisor;
    let bsr = 63 - (divisor.leading_zeros() as u64);
    for _ in 0..=bsr {
        if remainder >= divisor - remainder {
            quotient = quotient.wrapping_mul(2).wrapping_add(1);
            remainder = remainder.wrapping_mul(2).wrapping_sub(divisor);
        } else {
            quotient = quotient.wrapping_mul(2);
            remainder = remainder.wrapping_mul(2);
        }
    }
    quotient
}

fn is_zero_or_power_of_2(v: u32) -> bool {
    v & v.wrapping_sub(1) == 0
}

// ─── Macro-op model ─────────────────────────────────────────────────────

const P0: u8 = 1;
const P1: u8 = 2;
const P5: u8 = 4;
const P01: u8 = P0 | P1;
const P05: u8 = P0 | P5;
const P015: u8 = P0 | P1 | P5;

#[derive(Clone, Copy)]
struct MacroOp {
    size: usize,
    latency: usize,
    /// 0 = eliminated (register rename, no execution unit).
    uop1: u8,
    /// Second uop for dual-uop ops, 0 otherwise.
    uop2: u8,
    /// Explicit dependency on the previous macro-op (IMUL_RCP).
    dependent: bool,
}

const fn mop(size: usize, latency: usize, uop1: u8, uop2: u8, dependent: bool) -> MacroOp {
    MacroOp { size, latency, uop1, uop2, dependent }
}

const SUB_RR: MacroOp = mop(3, 1, P015, 0, false);
const XOR_RR: MacroOp = mop(3, 1, P015, 0, false);
const LEA_SIB: MacroOp = mop(4, 1, P01, 0, false);
const IMUL_RR: MacroOp = mop(4, 3, P1, 0, false);
const IMUL_RR_DEP: MacroOp = mop(4, 3, P1, 0, true);
const ROR_RI: MacroOp = mop(4, 1, P05, 0, false);
const ADD_RI7: MacroOp = mop(7, 1, P015, 0, false);
const XOR_RI7: MacroOp = mop(7, 1, P015, 0, false);
const ADD_RI8: MacroOp = mop(8, 1, P015, 0, false);
const XOR_RI8: MacroOp = mop(8, 1, P015, 0, false);
const ADD_RI9: MacroOp = mop(9, 1, P015, 0, false);
const XOR_RI9: MacroOp = mop(9, 1, P015, 0, false);
const MOV_RR: MacroOp = mop(3, 0, 0, 0, false);
const MOV_RI64: MacroOp = mop(10, 1, P015, 0, false);
const MUL_R: MacroOp = mop(3, 4, P1, P5, false);
const IMUL_R1: MacroOp = mop(3, 4, P1, P5, false);

struct OpInfo {
    ops: &'static [MacroOp],
    /// Macro-op index whose completion produces the result.
    result_op: usize,
    /// Macro-op index that consumes the destination register.
    dst_op: usize,
    /// Macro-op index that consumes the source register (usize::MAX =
    /// no source register).
    src_op: usize,
    /// Destination may equal source.
    can_reuse: bool,
    /// opGroupPar becomes the source register after selection.
    group_par_is_source: bool,
}

const NO_SRC: usize = usize::MAX;

fn op_info(op: SsOp) -> &'static OpInfo {
    match op {
        SsOp::ISubR => &OpInfo {
            ops: &[SUB_RR],
            result_op: 0,
            dst_op: 0,
            src_op: 0,
            can_reuse: false,
            group_par_is_source: true,
        },
        SsOp::IXorR => &OpInfo {
            ops: &[XOR_RR],
            result_op: 0,
            dst_op: 0,
            src_op: 0,
            can_reuse: false,
            group_par_is_source: true,
        },
        SsOp::IAddRs => &OpInfo {
            ops: &[LEA_SIB],
            result_op: 0,
            dst_op: 0,
            src_op: 0,
            can_reuse: false,
            group_par_is_source: true,
        },
        SsOp::IMulR => &OpInfo {
            ops: &[IMUL_RR],
            result_op: 0,
            dst_op: 0,
            src_op: 0,
            can_reuse: false,
            group_par_is_source: true,
        },
        SsOp::IRorC => &OpInfo {
            ops: &[ROR_RI],
            result_op: 0,
            dst_op: 0,
            src_op: NO_SRC,
            can_reuse: false,
            group_par_is_source: false,
        },
        SsOp::IAddC7 => &OpInfo {
            ops: &[ADD_RI7],
            result_op: 0,
            dst_op: 0,
            src_op: NO_SRC,
            can_reuse: false,
            group_par_is_source: false,
        },
        SsOp::IXorC7 => &OpInfo {
            ops: &[XOR_RI7],
            result_op: 0,
            dst_op: 0,
            src_op: NO_SRC,
            can_reuse: false,
            group_par_is_source: false,
        },
        SsOp::IAddC8 => &OpInfo {
            ops: &[ADD_RI8],
            result_op: 0,
            dst_op: 0,
            src_op: NO_SRC,
            can_reuse: false,
            group_par_is_source: false,
        },
        SsOp::IXorC8 => &OpInfo {
            ops: &[XOR_RI8],
            result_op: 0,
            dst_op: 0,
            src_op: NO_SRC,
            can_reuse: false,
            group_par_is_source: false,
        },
        SsOp::IAddC9 => &OpInfo {
            ops: &[ADD_RI9],
            result_op: 0,
            dst_op: 0,
            src_op: NO_SRC,
            can_reuse: false,
            group_par_is_source: false,
        },
        SsOp::IXorC9 => &OpInfo {
            ops: &[XOR_RI9],
            result_op: 0,
            dst_op: 0,
            src_op: NO_SRC,
            can_reuse: false,
            group_par_is_source: false,
        },
        SsOp::IMulhR => &OpInfo {
            ops: &[MOV_RR, MUL_R, MOV_RR],
            result_op: 1,
            dst_op: 0,
            src_op: 1,
            can_reuse: true,
            group_par_is_source: false,
        },
        SsOp::ISmulhR => &OpInfo {
            ops: &[MOV_RR, IMUL_R1, MOV_RR],
            result_op: 1,
            dst_op: 0,
            src_op: 1,
            can_reuse: true,
            group_par_is_source: false,
        },
        SsOp::IMulRcp => &OpInfo {
            ops: &[MOV_RI64, IMUL_RR_DEP],
            result_op: 1,
            dst_op: 1,
            src_op: NO_SRC,
            can_reuse: false,
            group_par_is_source: false,
        },
    }
}

// ─── Decode buffers ─────────────────────────────────────────────────────

struct DecoderBuffer {
    index: usize,
    counts: &'static [usize],
}

static D484: DecoderBuffer = DecoderBuffer { index: 0, counts: &[4, 8, 4] };
static D7333: DecoderBuffer = DecoderBuffer { index: 1, counts: &[7, 3, 3, 3] };
static D3733: DecoderBuffer = DecoderBuffer { index: 2, counts: &[3, 7, 3, 3] };
static D493: DecoderBuffer = DecoderBuffer { index: 3, counts: &[4, 9, 3] };
static D4444: DecoderBuffer = DecoderBuffer { index: 4, counts: &[4, 4, 4, 4] };
static D3310: DecoderBuffer = DecoderBuffer { index: 5, counts: &[3, 3, 10] };
static DEFAULTS: [&DecoderBuffer; 4] = [&D484, &D7333, &D3733, &D493];

fn fetch_next(
    prev: Option<SsOp>,
    decode_cycle: usize,
    mul_count: usize,
    gen: &mut Blake2Generator,
) -> &'static DecoderBuffer {
    // A wide multiplication (2 uops) forces the 3-3-10 configuration.
    if matches!(prev, Some(SsOp::IMulhR) | Some(SsOp::ISmulhR)) {
        return &D3310;
    }
    // Keep the multiplication port saturated.
    if mul_count < decode_cycle + 1 {
        return &D4444;
    }
    // IMUL_RCP ends with a multiplication: start the next buffer with a
    // 4-byte multiplication slot.
    if prev == Some(SsOp::IMulRcp) {
        return if gen.get_byte() & 1 != 0 { &D484 } else { &D493 };
    }
    DEFAULTS[(gen.get_byte() & 3) as usize]
}

// ─── In-flight instruction ──────────────────────────────────────────────

const GROUP_NONE: u32 = u32::MAX;

#[derive(Clone, Copy)]
struct RegisterInfo {
    latency: usize,
    last_op_group: Option<SsOp>,
    last_op_par: u32,
}

impl Default for RegisterInfo {
    fn default() -> Self {
        Self { latency: 0, last_op_group: None, last_op_par: GROUP_NONE }
    }
}

struct PendingInstruction {
    op: SsOp,
    dst: usize,
    src: Option<usize>,
    mod_byte: u8,
    imm32: u32,
    op_group: SsOp,
    op_group_par: u32,
}

impl PendingInstruction {
    fn create_for_slot(
        gen: &mut Blake2Generator,
        slot_size: usize,
        buffer_index: usize,
        is_last: bool,
    ) -> Self {
        let op = match slot_size {
            3 if !is_last => [SsOp::ISubR, SsOp::IXorR][(gen.get_byte() & 1) as usize],
            3 => [SsOp::ISubR, SsOp::IXorR, SsOp::IMulhR, SsOp::ISmulhR]
                [(gen.get_byte() & 3) as usize],
            4 => {
                if buffer_index == 4 && !is_last {
                    SsOp::IMulR
                } else {
                    [SsOp::IRorC, SsOp::IAddRs][(gen.get_byte() & 1) as usize]
                }
            }
            7 => [SsOp::IXorC7, SsOp::IAddC7][(gen.get_byte() & 1) as usize],
            8 => [SsOp::IXorC8, SsOp::IAddC8][(gen.get_byte() & 1) as usize],
            9 => [SsOp::IXorC9, SsOp::IAddC9][(gen.get_byte() & 1) as usize],
            10 => SsOp::IMulRcp,
            _ => unreachable!("invalid decode slot"),
        };

        let mut pending = PendingInstruction {
            op,
            dst: 0,
            src: None,
            mod_byte: 0,
            imm32: 0,
            op_group: op,
            op_group_par: GROUP_NONE,
        };
        match op {
            SsOp::ISubR => pending.op_group = SsOp::IAddRs,
            SsOp::IAddRs => pending.mod_byte = gen.get_byte(),
            SsOp::IRorC => {
                loop {
                    pending.imm32 = (gen.get_byte() & 63) as u32;
                    if pending.imm32 != 0 {
                        break;
                    }
                }
            }
            SsOp::IAddC8 | SsOp::IAddC9 => {
                pending.imm32 = gen.get_u32();
                pending.op_group = SsOp::IAddC7;
            }
            SsOp::IAddC7 => pending.imm32 = gen.get_u32(),
            SsOp::IXorC8 | SsOp::IXorC9 => {
                pending.imm32 = gen.get_u32();
                pending.op_group = SsOp::IXorC7;
            }
            SsOp::IXorC7 => pending.imm32 = gen.get_u32(),
            SsOp::IMulhR | SsOp::ISmulhR => pending.op_group_par = gen.get_u32(),
            SsOp::IMulRcp => {
                loop {
                    pending.imm32 = gen.get_u32();
                    if !is_zero_or_power_of_2(pending.imm32) {
                        break;
                    }
                }
            }
            _ => {}
        }
        pending
    }

    fn select_source(
        &mut self,
        cycle: usize,
        registers: &[RegisterInfo; 8],
        gen: &mut Blake2Generator,
    ) -> bool {
        let available: Vec<usize> = (0..8).filter(|&i| registers[i].latency <= cycle).collect();
        // With exactly two candidates for IADD_RS, prefer r5 as the
        // source since it can never be the destination.
        if available.len() == 2 && self.op == SsOp::IAddRs {
            if available.contains(&REGISTER_NEEDS_DISPLACEMENT) {
                self.src = Some(REGISTER_NEEDS_DISPLACEMENT);
                self.op_group_par = REGISTER_NEEDS_DISPLACEMENT as u32;
                return true;
            }
        }
        match select_register(&available, gen) {
            Some(r) => {
                self.src = Some(r);
                if op_info(self.op).group_par_is_source {
                    self.op_group_par = r as u32;
                }
                true
            }
            None => false,
        }
    }

    fn select_destination(
        &mut self,
        cycle: usize,
        allow_chained_mul: bool,
        registers: &[RegisterInfo; 8],
        gen: &mut Blake2Generator,
    ) -> bool {
        let info = op_info(self.op);
        let available: Vec<usize> = (0..8)
            .filter(|&i| {
                let reg = &registers[i];
                reg.latency <= cycle
                    && (info.can_reuse || Some(i) != self.src)
                    && (allow_chained_mul
                        || self.op_group != SsOp::IMulR
                        || reg.last_op_group != Some(SsOp::IMulR))
                    && (reg.last_op_group != Some(self.op_group)
                        || reg.last_op_par != self.op_group_par)
                    && (self.op != SsOp::IAddRs || i != REGISTER_NEEDS_DISPLACEMENT)
            })
            .collect();
        match select_register(&available, gen) {
            Some(r) => {
                self.dst = r;
                true
            }
            None => false,
        }
    }
}

fn select_register(available: &[usize], gen: &mut Blake2Generator) -> Option<usize> {
    if available.is_empty() {
        return None;
    }
    let index = if available.len() > 1 {
        (gen.get_u32() as usize) % available.len()
    } else {
        0
    };
    Some(available[index])
}

// ─── Port scheduling ────────────────────────────────────────────────────

type PortMap = [[bool; 3]; CYCLE_MAP_SIZE];

fn schedule_uop(uop: u8, ports: &mut PortMap, start: usize, commit: bool) -> Option<usize> {
    // P5 first, then P0, then P1, to spare the multiplication port.
    for cycle in start..CYCLE_MAP_SIZE {
        if uop & P5 != 0 && !ports[cycle][2] {
            if commit {
                ports[cycle][2] = true;
            }
            return Some(cycle);
        }
        if uop & P0 != 0 && !ports[cycle][0] {
            if commit {
                ports[cycle][0] = true;
            }
            return Some(cycle);
        }
        if uop & P1 != 0 && !ports[cycle][1] {
            if commit {
                ports[cycle][1] = true;
            }
            return Some(cycle);
        }
    }
    None
}

fn schedule_mop(
    op: &MacroOp,
    ports: &mut PortMap,
    cycle: usize,
    dep_cycle: usize,
    commit: bool,
) -> Option<usize> {
    let mut cycle = cycle;
    if op.dependent {
        cycle = cycle.max(dep_cycle);
    }
    if op.uop1 == 0 {
        // Eliminated move: no execution resources.
        return Some(cycle);
    }
    if op.uop2 == 0 {
        return schedule_uop(op.uop1, ports, cycle, commit);
    }
    // Both uops must land in the same cycle.
    for c in cycle..CYCLE_MAP_SIZE {
        let c1 = schedule_uop(op.uop1, ports, c, false);
        let c2 = schedule_uop(op.uop2, ports, c, false);
        if c1.is_some() && c1 == c2 {
            let cycle = c1.expect("checked is_some");
            if commit {
                schedule_uop(op.uop1, ports, cycle, true);
                schedule_uop(op.uop2, ports, cycle, true);
            }
            return Some(cycle);
        }
    }
    None
}

// ─── Program generation ─────────────────────────────────────────────────

pub fn generate(gen: &mut Blake2Generator) -> SuperscalarProgram {
    let mut ports: PortMap = [[false; 3]; CYCLE_MAP_SIZE];
    let mut registers = [RegisterInfo::default(); 8];
    let mut program: Vec<SsInstruction> = Vec::with_capacity(SUPERSCALAR_MAX_SIZE);

    let mut current: Option<PendingInstruction> = None;
    let mut macro_op_index = 0usize;
    let mut cycle = 0usize;
    let mut dep_cycle = 0usize;
    let mut mul_count = 0usize;
    let mut throw_away_count = 0usize;
    let mut ports_saturated = false;
    // Type of the most recently created instruction (thrown-away ones
    // included) — drives the next decode-buffer choice.
    let mut last_created: Option<SsOp> = None;

    let mut decode_cycle = 0;
    while decode_cycle < SUPERSCALAR_LATENCY
        && !ports_saturated
        && program.len() < SUPERSCALAR_MAX_SIZE
    {
        let decode_buffer = fetch_next(last_created, decode_cycle, mul_count, gen);

        let mut buffer_index = 0;
        while buffer_index < decode_buffer.counts.len() {
            let top_cycle = cycle;

            let needs_new = current
                .as_ref()
                .map(|c| macro_op_index >= op_info(c.op).ops.len())
                .unwrap_or(true);
            if needs_new {
                if ports_saturated || program.len() >= SUPERSCALAR_MAX_SIZE {
                    break;
                }
                let created = PendingInstruction::create_for_slot(
                    gen,
                    decode_buffer.counts[buffer_index],
                    decode_buffer.index,
                    buffer_index + 1 == decode_buffer.counts.len(),
                );
                last_created = Some(created.op);
                current = Some(created);
                macro_op_index = 0;
            }
            let instr = current.as_mut().expect("instruction in flight");
            let info = op_info(instr.op);
            let op = &info.ops[macro_op_index];

            // Earliest execution cycle for this macro-op.
            let Some(mut schedule_cycle) = schedule_mop(op, &mut ports, cycle, dep_cycle, false)
            else {
                ports_saturated = true;
                break;
            };

            // Source register, looking up to 4 cycles ahead.
            if macro_op_index == info.src_op {
                let mut forward = 0;
                while forward < LOOK_FORWARD_CYCLES
                    && !instr.select_source(schedule_cycle, &registers, gen)
                {
                    schedule_cycle += 1;
                    cycle += 1;
                    forward += 1;
                }
                if forward == LOOK_FORWARD_CYCLES {
                    if throw_away_count < MAX_THROWAWAY_COUNT {
                        throw_away_count += 1;
                        // Discard the instruction and try the slot again.
                        macro_op_index = info.ops.len();
                        continue;
                    }
                    current = None;
                    last_created = None;
                    break;
                }
            }

            // Destination register.
            if macro_op_index == info.dst_op {
                let mut forward = 0;
                while forward < LOOK_FORWARD_CYCLES
                    && !instr.select_destination(
                        schedule_cycle,
                        throw_away_count > 0,
                        &registers,
                        gen,
                    )
                {
                    schedule_cycle += 1;
                    cycle += 1;
                    forward += 1;
                }
                if forward == LOOK_FORWARD_CYCLES {
                    if throw_away_count < MAX_THROWAWAY_COUNT {
                        throw_away_count += 1;
                        macro_op_index = info.ops.len();
                        continue;
                    }
                    current = None;
                    last_created = None;
                    break;
                }
            }
            throw_away_count = 0;

            // Commit the schedule now that operands are known.
            let Some(committed) = schedule_mop(op, &mut ports, schedule_cycle, schedule_cycle, true)
            else {
                ports_saturated = true;
                break;
            };
            let schedule_cycle = committed;
            dep_cycle = schedule_cycle + op.latency;

            if macro_op_index == info.result_op {
                let retire = dep_cycle;
                registers[instr.dst] = RegisterInfo {
                    latency: retire,
                    last_op_group: Some(instr.op_group),
                    last_op_par: instr.op_group_par,
                };
            }

            buffer_index += 1;
            macro_op_index += 1;

            if schedule_cycle >= SUPERSCALAR_LATENCY {
                ports_saturated = true;
            }
            cycle = top_cycle;

            if macro_op_index >= info.ops.len() {
                let done = current.take().expect("instruction in flight");
                last_created = Some(done.op);
                if done.op.is_multiplication() {
                    mul_count += 1;
                }
                let rcp = if done.op == SsOp::IMulRcp { reciprocal(done.imm32) } else { 0 };
                program.push(SsInstruction {
                    op: done.op,
                    dst: done.dst,
                    src: done.src.unwrap_or(done.dst),
                    mod_byte: done.mod_byte,
                    imm32: done.imm32,
                    reciprocal: rcp,
                });
                macro_op_index = 0;
            }
        }
        cycle += 1;
        decode_cycle += 1;
    }

    // The address register: highest simulated single-cycle ("ASIC")
    // latency, ties going to the lowest index.
    let mut asic_latency = [0usize; 8];
    for instr in &program {
        let dst_lat = asic_latency[instr.dst] + 1;
        let src_lat = if instr.src != instr.dst { asic_latency[instr.src] + 1 } else { 0 };
        asic_latency[instr.dst] = dst_lat.max(src_lat);
    }
    let mut address_register = 0;
    for i in 1..8 {
        if asic_latency[i] > asic_latency[address_register] {
            address_register = i;
        }
    }

    SuperscalarProgram { instructions: program, address_register }
}

// ─── Execution ──────────────────────────────────────────────────────────

fn sign_extend(imm: u32) -> u64 {
    imm as i32 as i64 as u64
}

pub fn execute(program: &SuperscalarProgram, r: &mut [u64; 8]) {
    for instr in &program.instructions {
        let dst = instr.dst;
        let src = instr.src;
        match instr.op {
            SsOp::ISubR => r[dst] = r[dst].wrapping_sub(r[src]),
            SsOp::IXorR => r[dst] ^= r[src],
            SsOp::IAddRs => {
                let shift = (instr.mod_byte >> 2) & 3;
                r[dst] = r[dst].wrapping_add(r[src] << shift);
            }
            SsOp::IMulR => r[dst] = r[dst].wrapping_mul(r[src]),
            SsOp::IRorC => r[dst] = r[dst].rotate_right(instr.imm32 & 63),
            SsOp::IAddC7 | SsOp::IAddC8 | SsOp::IAddC9 => {
                r[dst] = r[dst].wrapping_add(sign_extend(instr.imm32));
            }
            SsOp::IXorC7 | SsOp::IXorC8 | SsOp::IXorC9 => {
                r[dst] ^= sign_extend(instr.imm32);
            }
            SsOp::IMulhR => {
                r[dst] = ((r[dst] as u128 * r[src] as u128) >> 64) as u64;
            }
            SsOp::ISmulhR => {
                r[dst] = ((r[dst] as i64 as i128 * r[src] as i64 as i128) >> 64) as u64;
            }
            SsOp::IMulRcp => r[dst] = r[dst].wrapping_mul(instr.reciprocal),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reciprocal_of_three() {
        assert_eq!(reciprocal(3), 12297829382473034410);
    }

    #[test]
    fn reciprocal_small_values() {
        // floor(2^x / d) for largest x with result < 2^64.
        assert_eq!(reciprocal(5), 14757395258967641292);
        assert_eq!(reciprocal(7), 10540996613548315209);
    }

    #[test]
    fn generation_is_deterministic() {
        let mut g1 = Blake2Generator::new(b"seed", 0);
        let mut g2 = Blake2Generator::new(b"seed", 0);
        let p1 = generate(&mut g1);
        let p2 = generate(&mut g2);
        assert_eq!(p1.instructions.len(), p2.instructions.len());
        assert_eq!(p1.address_register, p2.address_register);
        for (a, b) in p1.instructions.iter().zip(&p2.instructions) {
            assert_eq!(a.op, b.op);
            assert_eq!((a.dst, a.src, a.imm32, a.mod_byte), (b.dst, b.src, b.imm32, b.mod_byte));
        }
    }

    #[test]
    fn program_shape_is_sane() {
        let mut gen = Blake2Generator::new(b"shape test", 0);
        let p = generate(&mut gen);
        assert!(p.instructions.len() > 60, "program too short: {}", p.instructions.len());
        assert!(p.instructions.len() <= SUPERSCALAR_MAX_SIZE);
        assert!(p.address_register < 8);
        // Multiplications are the backbone of superscalar programs.
        let muls = p.instructions.iter().filter(|i| i.op.is_multiplication()).count();
        assert!(muls * 3 > p.instructions.len(), "too few multiplications: {muls}");
        // IADD_RS must never target r5.
        for i in &p.instructions {
            if i.op == SsOp::IAddRs {
                assert_ne!(i.dst, REGISTER_NEEDS_DISPLACEMENT);
            }
        }
    }

    #[test]
    fn execution_mixes_all_registers() {
        let mut gen = Blake2Generator::new(b"exec", 0);
        let p = generate(&mut gen);
        let mut r = [1u64, 2, 3, 4, 5, 6, 7, 8];
        let before = r;
        execute(&p, &mut r);
        let changed = r.iter().zip(&before).filter(|(a, b)| a != b).count();
        assert!(changed >= 7, "only {changed} registers changed");
    }

    #[test]
    fn distinct_nonces_give_distinct_programs() {
        let mut g1 = Blake2Generator::new(b"seed", 0);
        let mut g2 = Blake2Generator::new(b"seed", 1);
        let p1 = generate(&mut g1);
        let p2 = generate(&mut g2);
        let same = p1
            .instructions
            .iter()
            .zip(&p2.instructions)
            .all(|(a, b)| a.op == b.op && a.dst == b.dst && a.src == b.src);
        assert!(!same || p1.instructions.len() != p2.instructions.len());
    }
}
