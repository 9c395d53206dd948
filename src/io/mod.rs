//! 输入输出：FASTA 参考、FASTQ 读段与制表符分隔的命中输出。

pub mod fasta;
pub mod fastq;
pub mod hits;
