pub const SIGMA: usize = 6; // {0:$, 1:A, 2:C, 3:G, 4:T, 5:N}

/// 可参与比对的碱基编码范围 [A, T]
pub const BASES: std::ops::RangeInclusive<u8> = 1..=4;

/// 读段中无法匹配任何参考碱基的编码
pub const N_CODE: u8 = 5;

#[inline]
pub fn to_alphabet(b: u8) -> u8 {
    if b == 0 { return 0; }
    match b.to_ascii_uppercase() {
        b'A' => 1,
        b'C' => 2,
        b'G' => 3,
        b'T' | b'U' => 4,
        _ => N_CODE, // map others to N
    }
}

#[inline]
pub fn from_alphabet(a: u8) -> u8 {
    match a {
        0 => b'$',
        1 => b'A',
        2 => b'C',
        3 => b'G',
        4 => b'T',
        _ => b'N',
    }
}

#[inline]
pub fn is_base(code: u8) -> bool {
    BASES.contains(&code)
}

pub fn normalize_seq(seq: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(seq.len());
    for &b in seq {
        let up = b.to_ascii_uppercase();
        let nb = match up {
            b'A' | b'C' | b'G' | b'T' | b'N' => up,
            b'U' => b'T',
            _ => b'N',
        };
        out.push(nb);
    }
    out
}

/// ASCII 序列直接转换为编码序列
pub fn encode(seq: &[u8]) -> Vec<u8> {
    seq.iter().map(|&b| to_alphabet(b)).collect()
}

/// 编码层面的互补：A<->T, C<->G，其余（N / $）保持不变
#[inline]
pub fn complement_code(code: u8) -> u8 {
    match code {
        1..=4 => 5 - code,
        other => other,
    }
}

/// 编码序列的反向互补
pub fn revcomp_codes(codes: &[u8]) -> Vec<u8> {
    codes.iter().rev().map(|&c| complement_code(c)).collect()
}

#[inline]
pub fn complement(base: u8) -> u8 {
    match base.to_ascii_uppercase() {
        b'A' => b'T',
        b'C' => b'G',
        b'G' => b'C',
        b'T' | b'U' => b'A',
        _ => b'N',
    }
}

pub fn revcomp(seq: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(seq.len());
    for &b in seq.iter().rev() {
        out.push(complement(b));
    }
    out
}

/// Phred+33 质量字符转数值，低于 '!' 的字符按 0 处理
#[inline]
pub fn phred(q: u8) -> u8 {
    q.saturating_sub(33)
}

/// 错配罚分。
///
/// `maq_round` 为真时沿用 MAQ 的做法：四舍五入到最近的 10，且不超过 30；
/// 否则直接使用 Phred 值。
#[inline]
pub fn mismatch_penalty(maq_round: bool, q: u8) -> u32 {
    let q = u32::from(q);
    if maq_round {
        (((q + 5) / 10) * 10).min(30)
    } else {
        q
    }
}
