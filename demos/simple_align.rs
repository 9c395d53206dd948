//! 演示如何在 library 模式下使用 seedmm-rust 做种子错配搜索。
//!
//! 运行方式：
//! ```bash
//! cargo run --example simple_align
//! ```

use seedmm_rust::index::ReferenceIndex;
use seedmm_rust::search::{
    AlignerFactory, CollectSink, PairedAlignerFactory, PairedConfig, Read, SeedConfig,
    UnpairedAlignerFactory,
};
use seedmm_rust::util::dna;

fn main() -> anyhow::Result<()> {
    // 1. 参考序列与索引
    let reference = b"ACGTACGTAGCTGATCGTAGCTAGCTAGCTGATCGTAGCTAGCTAGCTGATTGACCATGGACTTAGCAAGTC";
    println!("参考长度: {} bp", reference.len());
    let index = ReferenceIndex::build(&[("ref1".to_string(), reference.to_vec())], 16, 4)?;
    println!("索引构建完成：正向 {} 行，镜像 {} 行", index.fw.len(), index.mirror.len());

    // 2. 单端：种子内一个错配
    let cfg = SeedConfig { seed_mms: 1, seed_len: 12, ..SeedConfig::default() };
    let factory = UnpairedAlignerFactory::new(&index, cfg)?;
    let mut aligner = factory.create();

    let read = Read::with_uniform_quality("r1", b"GACCATCGACTTAG", b'I');
    let mut sink = CollectSink::new();
    let outcome = aligner.align(&read, &mut sink)?;
    println!("\n单端 '{}': {} 个区间", String::from_utf8_lossy(&read.seq), outcome.ranges);
    for hit in &sink.hits {
        let edits: Vec<String> = hit.edits.iter().map(ToString::to_string).collect();
        println!(
            "  {} {}:{} 错配=[{}] 罚分={}",
            hit.strand.symbol(),
            index.contigs[hit.contig].name,
            hit.offset,
            edits.join(","),
            hit.penalty
        );
    }

    // 3. 双端：mate2 取自参考下游片段的反向互补
    let mate1 = Read::with_uniform_quality("p1/1", &reference[0..14], b'I');
    let mate2 = Read::with_uniform_quality("p1/2", &dna::revcomp(&reference[40..54]), b'I');
    let seed = SeedConfig { seed_mms: 0, seed_len: 12, ..SeedConfig::default() };
    let pcfg = PairedConfig { seed, ..PairedConfig::default() };
    let pfactory = PairedAlignerFactory::new(&index, pcfg)?;
    let mut paligner = pfactory.create();
    let mut psink = CollectSink::new();
    let poutcome = paligner.align(&mate1, &mate2, &mut psink)?;
    println!("\n双端: {:?}", poutcome.pair);
    for (m1, m2) in &psink.pairs {
        println!(
            "  mate1 {}{}  mate2 {}{}  片段={}",
            m1.strand.symbol(),
            m1.offset,
            m2.strand.symbol(),
            m2.offset,
            m2.end() - m1.offset
        );
    }

    println!("\n完成！");
    Ok(())
}
