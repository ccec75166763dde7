//! DVH 表的两种展示形式.
//!
//! 1. 宽表: 每个结构一行, 每个剂量点一列. 适用于面积图.
//! 2. 长表: 每个 (结构, 剂量) 一行, 列为 `Dose, Structure, Volume`. 适用于按结构分组的折线图.
//!
//! 两者都只是同一份 [`DvhTable`] 的重排, 可以逐位无损地还原, 不需要重新计算.

use std::borrow::Cow;
use std::collections::{HashMap, HashSet};
use std::io::{self, Write};

use itertools::Itertools;

use super::{DoseAxis, DvhCurve, DvhTable, TableError};
use crate::consts::column;

/// 宽表的一行.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WideRow {
    /// 结构名.
    pub structure: String,

    /// 与剂量轴对齐的体积百分比.
    pub volumes: Vec<f64>,
}

/// 宽表.
#[derive(Clone, Debug, PartialEq)]
pub struct WideTable {
    axis: DoseAxis,
    rows: Vec<WideRow>,
}

/// 长表的一行.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LongRow {
    /// 剂量.
    pub dose: f64,

    /// 结构名.
    pub structure: String,

    /// 体积百分比.
    pub volume: f64,
}

/// 长表.
#[derive(Clone, Debug, PartialEq)]
pub struct LongTable {
    axis: DoseAxis,
    rows: Vec<LongRow>,
}

/// 需要时为 csv 字段加引号.
fn csv_field(s: &str) -> Cow<'_, str> {
    if s.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", s.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(s)
    }
}

impl WideTable {
    /// 由剂量轴和若干行直接构建. 数据一致性在 [`WideTable::into_table`] 时检查.
    #[inline]
    pub fn new(axis: DoseAxis, rows: Vec<WideRow>) -> Self {
        Self { axis, rows }
    }

    pub(crate) fn from_table(table: &DvhTable) -> Self {
        let rows = table
            .iter()
            .map(|(name, curve)| WideRow {
                structure: name.to_owned(),
                volumes: curve.volumes().to_vec(),
            })
            .collect();
        Self::new(table.axis().clone(), rows)
    }

    /// 列对应的剂量.
    #[inline]
    pub fn doses(&self) -> &[f64] {
        self.axis.points()
    }

    /// 所有行.
    #[inline]
    pub fn rows(&self) -> &[WideRow] {
        &self.rows
    }

    /// 还原为 DVH 表.
    pub fn into_table(self) -> Result<DvhTable, TableError> {
        if self.rows.is_empty() {
            return Err(TableError::Empty);
        }

        let mut seen = HashSet::new();
        let mut curves = Vec::with_capacity(self.rows.len());
        for WideRow { structure, volumes } in self.rows {
            if !seen.insert(structure.clone()) {
                return Err(TableError::DuplicateStructure(structure));
            }
            if volumes.len() != self.axis.len() {
                return Err(TableError::Length {
                    structure,
                    expected: self.axis.len(),
                    found: volumes.len(),
                });
            }
            let curve = DvhCurve::from_parts(self.axis.clone(), volumes);
            curves.push((structure, curve));
        }
        Ok(DvhTable::from_parts(self.axis, curves))
    }

    /// 以 csv 格式写入 `w`. 表头为 `Structure,<dose0>,<dose1>,...`.
    pub fn write_csv<W: Write>(&self, mut w: W) -> io::Result<()> {
        writeln!(w, "{},{}", column::STRUCTURE, self.axis.iter().join(","))?;
        for row in self.rows.iter() {
            writeln!(
                w,
                "{},{}",
                csv_field(&row.structure),
                row.volumes.iter().join(",")
            )?;
        }
        Ok(())
    }
}

impl LongTable {
    /// 由剂量轴和若干行直接构建. 数据一致性在 [`LongTable::into_table`] 时检查.
    #[inline]
    pub fn new(axis: DoseAxis, rows: Vec<LongRow>) -> Self {
        Self { axis, rows }
    }

    pub(crate) fn from_table(table: &DvhTable) -> Self {
        let rows = table
            .iter()
            .flat_map(|(name, curve)| {
                curve.iter().map(move |(dose, volume)| LongRow {
                    dose,
                    structure: name.to_owned(),
                    volume,
                })
            })
            .collect();
        Self::new(table.axis().clone(), rows)
    }

    /// 剂量轴.
    #[inline]
    pub fn axis(&self) -> &DoseAxis {
        &self.axis
    }

    /// 所有行.
    #[inline]
    pub fn rows(&self) -> &[LongRow] {
        &self.rows
    }

    /// 还原为 DVH 表. 结构顺序为其在长表中首次出现的顺序,
    /// 每个结构的剂量列必须与剂量轴逐位一致.
    pub fn into_table(self) -> Result<DvhTable, TableError> {
        let mut index: HashMap<String, usize> = HashMap::new();
        let mut groups: Vec<(String, Vec<f64>, Vec<f64>)> = Vec::new();
        for LongRow {
            dose,
            structure,
            volume,
        } in self.rows
        {
            let slot = *index.entry(structure.clone()).or_insert_with(|| {
                groups.push((structure, Vec::new(), Vec::new()));
                groups.len() - 1
            });
            let (_, doses, volumes) = &mut groups[slot];
            doses.push(dose);
            volumes.push(volume);
        }

        if groups.is_empty() {
            return Err(TableError::Empty);
        }

        let mut curves = Vec::with_capacity(groups.len());
        for (structure, doses, volumes) in groups {
            if volumes.len() != self.axis.len() {
                return Err(TableError::Length {
                    structure,
                    expected: self.axis.len(),
                    found: volumes.len(),
                });
            }
            let aligned = doses
                .iter()
                .zip(self.axis.iter())
                .all(|(a, b)| a.to_bits() == b.to_bits());
            if !aligned {
                return Err(TableError::AxisMismatch(structure));
            }
            let curve = DvhCurve::from_parts(self.axis.clone(), volumes);
            curves.push((structure, curve));
        }
        Ok(DvhTable::from_parts(self.axis, curves))
    }

    /// 以 csv 格式写入 `w`. 表头为 `Dose,Structure,Volume`.
    pub fn write_csv<W: Write>(&self, mut w: W) -> io::Result<()> {
        writeln!(
            w,
            "{},{},{}",
            column::DOSE,
            column::STRUCTURE,
            column::VOLUME
        )?;
        for row in self.rows.iter() {
            writeln!(
                w,
                "{},{},{}",
                row.dose,
                csv_field(&row.structure),
                row.volume
            )?;
        }
        Ok(())
    }
}
