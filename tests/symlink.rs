mod common;

use common::new_fs;
use memfs::Error;
use memfs::FileType;
use memfs::MAX_SYMLINK_DEPTH;

#[test]
fn test_cd_through_symlink() {
    let mut fs = new_fs(8);
    let a = fs.mkdir("/a").unwrap();
    fs.symlink("/a", "/l").unwrap();
    fs.cd("/l").unwrap();
    assert_eq!(fs.cwd_id(), a);
    assert_eq!(fs.pwd().unwrap(), "/a");
}

#[test]
fn test_relative_target_joins_link_directory() {
    let mut fs = new_fs(8);
    fs.mkdir("/a").unwrap();
    let f = fs.create("/a/f").unwrap();
    fs.symlink("f", "/a/l").unwrap();
    assert_eq!(fs.stat("/a/l").unwrap().id, f);
    fs.symlink("a/f", "/top").unwrap();
    assert_eq!(fs.stat("/top").unwrap().id, f);
}

#[test]
fn test_symlink_chain_depth() {
    let mut fs = new_fs(32);
    let a = fs.mkdir("/a").unwrap();
    fs.symlink("/a", "/l0").unwrap();
    for i in 1..=MAX_SYMLINK_DEPTH {
        fs.symlink(&format!("/l{}", i - 1), &format!("/l{}", i)).unwrap();
    }
    // /l9 takes ten hops to reach /a, /l10 takes eleven.
    let last_ok = format!("/l{}", MAX_SYMLINK_DEPTH - 1);
    assert_eq!(fs.stat(&last_ok).unwrap().id, a);
    let too_deep = format!("/l{}", MAX_SYMLINK_DEPTH);
    assert_eq!(fs.cd(&too_deep), Err(Error::TooManySymlinkLevels(too_deep.clone())));
    assert_eq!(fs.lstat(&too_deep).unwrap().ftype, FileType::Symlink);
}

#[test]
fn test_symlink_loop() {
    let mut fs = new_fs(8);
    fs.symlink("/b", "/a").unwrap();
    fs.symlink("/a", "/b").unwrap();
    assert_eq!(fs.open("/a"), Err(Error::TooManySymlinkLevels("/a".into())));
    assert_eq!(fs.create("/a/x"), Err(Error::TooManySymlinkLevels("/a/x".into())));
    fs.unlink("/a").unwrap();
    assert_eq!(fs.open("/b"), Err(Error::NotFound("/b".into())));
}

#[test]
fn test_stat_and_lstat() {
    let mut fs = new_fs(8);
    let f = fs.create("/f").unwrap();
    let l = fs.symlink("/f", "/l").unwrap();
    let stat = fs.stat("/l").unwrap();
    assert_eq!(stat.id, f);
    assert_eq!(stat.ftype, FileType::Regular);
    let lstat = fs.lstat("/l").unwrap();
    assert_eq!(lstat.id, l);
    assert_eq!(lstat.ftype, FileType::Symlink);
    assert_eq!(lstat.size, 2);
    assert_eq!(fs.readlink("/l").unwrap(), "/f");
    assert!(matches!(fs.readlink("/f"), Err(Error::InvalidArgument(_))));
}

#[test]
fn test_io_through_symlink() {
    let mut fs = new_fs(8);
    fs.create("/f").unwrap();
    fs.symlink("/f", "/l").unwrap();
    let fd = fs.open("/l").unwrap();
    fs.write(fd, b"via link").unwrap();
    fs.close(fd).unwrap();
    assert_eq!(fs.stat("/f").unwrap().size, 8);
    fs.truncate("/l", 3).unwrap();
    assert_eq!(fs.stat("/f").unwrap().size, 3);
}

#[test]
fn test_unlink_removes_link_not_target() {
    let mut fs = new_fs(8);
    fs.create("/f").unwrap();
    fs.symlink("/f", "/l").unwrap();
    fs.unlink("/l").unwrap();
    assert!(fs.stat("/f").is_ok());
    assert!(matches!(fs.lstat("/l"), Err(Error::NotFound(_))));
}

#[test]
fn test_dangling_symlink() {
    let mut fs = new_fs(8);
    fs.symlink("/target", "/l").unwrap();
    assert_eq!(fs.stat("/l"), Err(Error::NotFound("/l".into())));
    assert_eq!(fs.lstat("/l").unwrap().ftype, FileType::Symlink);
    // Creating through a dangling link creates its target.
    let id = fs.create("/l").unwrap();
    assert_eq!(fs.stat("/target").unwrap().id, id);
    assert_eq!(fs.create("/l"), Err(Error::AlreadyExists("/l".into())));
}

#[test]
fn test_intermediate_symlink_component() {
    let mut fs = new_fs(8);
    fs.mkdir("/real").unwrap();
    fs.symlink("/real", "/alias").unwrap();
    let id = fs.create("/alias/f").unwrap();
    assert_eq!(fs.stat("/real/f").unwrap().id, id);
    fs.mkdir("/alias/sub").unwrap();
    assert_eq!(fs.rmdir("/real"), Err(Error::NotEmpty("/real".into())));
}

#[test]
fn test_hard_link_to_symlink() {
    let mut fs = new_fs(8);
    fs.create("/f").unwrap();
    let l = fs.symlink("/f", "/l").unwrap();
    fs.link("/l", "/l2").unwrap();
    assert_eq!(fs.lstat("/l2").unwrap().id, l);
    assert_eq!(fs.lstat("/l").unwrap().links_cnt, 2);
    assert_eq!(fs.readlink("/l2").unwrap(), "/f");
}

#[test]
fn test_symlink_errors() {
    let mut fs = new_fs(8);
    fs.create("/f").unwrap();
    assert_eq!(fs.symlink("/x", "/f"), Err(Error::AlreadyExists("/f".into())));
    assert!(matches!(fs.symlink("", "/l"), Err(Error::InvalidArgument(_))));
    assert_eq!(fs.symlink("/x", "/nope/l"), Err(Error::NotFound("/nope/l".into())));
}
